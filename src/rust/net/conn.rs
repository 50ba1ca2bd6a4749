// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    net::flags::EventFlags,
    runtime::QType,
};
use ::std::{
    any::Any,
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Identifier of a connection within the network engine.
pub type ConnId = u32;

/// Handler that the engine runs for a connection that has event hooks installed. It runs in event context, so it must
/// not block. The returned flags replace the ones the engine acts upon.
pub type EventHandler = fn(&mut DeliveryBuffer, &mut ConnectionControlBlock, EventFlags) -> EventFlags;

/// Inbound payload that goes along with the event being delivered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryBuffer {
    data: Vec<u8>,
}

/// Per-connection state of the network engine.
pub struct ConnectionControlBlock {
    id: ConnId,
    protocol: QType,
    listening: bool,
    freed: bool,
    /// Events that the installed handler wants to see.
    interest: EventFlags,
    /// State owned by whoever installed the handler.
    private: Option<Box<dyn Any + Send>>,
    handler: Option<EventHandler>,
}

/// A connection control block and the lock that serializes the task and event contexts on it.
pub struct Connection {
    id: ConnId,
    cb: Mutex<ConnectionControlBlock>,
}

pub type SharedConnection = Arc<Connection>;

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl DeliveryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops the pending payload, so that nothing is handed to the application.
    pub fn discard(&mut self) {
        self.data.clear();
    }
}

impl ConnectionControlBlock {
    fn new(id: ConnId, protocol: QType) -> Self {
        Self {
            id,
            protocol,
            listening: false,
            freed: false,
            interest: EventFlags::empty(),
            private: None,
            handler: None,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn protocol(&self) -> QType {
        self.protocol
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    pub fn mark_freed(&mut self) {
        self.freed = true;
    }

    pub fn interest(&self) -> EventFlags {
        self.interest
    }

    /// Installs event hooks: the private state, the events of interest, and the handler go in together. Returns
    /// private state that was displaced, if any.
    pub fn install_event_hooks(
        &mut self,
        private: Box<dyn Any + Send>,
        interest: EventFlags,
        handler: EventHandler,
    ) -> Option<Box<dyn Any + Send>> {
        let displaced: Option<Box<dyn Any + Send>> = self.private.replace(private);
        self.interest = interest;
        self.handler = Some(handler);
        displaced
    }

    /// Removes event hooks and hands back the private state. Safe to call when nothing is installed.
    pub fn clear_event_hooks(&mut self) -> Option<Box<dyn Any + Send>> {
        self.interest = EventFlags::empty();
        self.handler = None;
        self.private.take()
    }

    pub fn has_event_hooks(&self) -> bool {
        debug_assert_eq!(self.private.is_some(), self.handler.is_some());
        self.private.is_some()
    }

    /// Borrows the private state if there is one and it has type `T`.
    pub fn private_data<T: Any>(&self) -> Option<&T> {
        self.private.as_ref().and_then(|private| private.downcast_ref::<T>())
    }

    pub fn handler(&self) -> Option<EventHandler> {
        self.handler
    }
}

impl Connection {
    pub fn new(id: ConnId, protocol: QType) -> Self {
        Self {
            id,
            cb: Mutex::new(ConnectionControlBlock::new(id, protocol)),
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Runs `f` with exclusive access to the control block. Neither the event context nor another task can touch the
    /// control block until `f` returns.
    pub fn critical_section<R>(&self, f: impl FnOnce(&mut ConnectionControlBlock) -> R) -> R {
        let mut cb: MutexGuard<ConnectionControlBlock> = self.cb.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cb)
    }

    /// Delivers an event. The installed handler runs if it is interested in any of `flags`; otherwise the flags pass
    /// through unchanged.
    pub fn deliver(&self, dev: &mut DeliveryBuffer, flags: EventFlags) -> EventFlags {
        self.critical_section(|cb: &mut ConnectionControlBlock| {
            let handler: Option<EventHandler> = cb.handler;
            match handler {
                Some(handler) if flags.intersects(cb.interest) => handler(dev, cb, flags),
                _ => flags,
            }
        })
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl From<Vec<u8>> for DeliveryBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for DeliveryBuffer {
    fn from(data: &[u8]) -> Self {
        Self { data: data.to_vec() }
    }
}

impl fmt::Debug for ConnectionControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionControlBlock")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("listening", &self.listening)
            .field("freed", &self.freed)
            .field("interest", &self.interest)
            .field("hooked", &self.private.is_some())
            .finish()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

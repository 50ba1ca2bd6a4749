// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    net::{
        conn::{
            ConnId,
            Connection,
            ConnectionControlBlock,
            DeliveryBuffer,
            SharedConnection,
        },
        engine::NetworkEngine,
        flags::EventFlags,
    },
    runtime::QType,
};
use ::std::{
    collections::{
        HashMap,
        VecDeque,
    },
    mem,
    sync::{
        atomic::{
            AtomicU32,
            Ordering,
        },
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    thread::{
        self,
        JoinHandle,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// An engine operation, as recorded by the [LoopbackEngine].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineCall {
    StopListening(ConnId),
    FreeStream(ConnId),
    FreeDatagram(ConnId),
    NotifyDriver(ConnId),
}

/// An event that the [LoopbackEngine] replays once the driver is notified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScriptedEvent {
    pub flags: EventFlags,
    pub payload: Vec<u8>,
}

/// Outcome of delivering one event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delivery {
    pub conn: ConnId,
    /// Flags handed to the connection.
    pub flags_in: EventFlags,
    /// Flags the connection handed back.
    pub flags_out: EventFlags,
    /// Payload left for the application after delivery.
    pub payload_len: usize,
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    scripts: HashMap<ConnId, VecDeque<ScriptedEvent>>,
    deliveries: Vec<Delivery>,
}

/// In-process network engine. Every operation is recorded, and scripted events are delivered from a dedicated thread
/// that plays the role of the event context.
pub struct LoopbackEngine {
    next_id: AtomicU32,
    state: Arc<Mutex<EngineState>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl ScriptedEvent {
    pub fn new(flags: EventFlags, payload: &[u8]) -> Self {
        Self {
            flags,
            payload: payload.to_vec(),
        }
    }

    /// Inbound data.
    pub fn newdata(payload: &[u8]) -> Self {
        Self::new(EventFlags::NEWDATA, payload)
    }

    /// Remote close.
    pub fn close() -> Self {
        Self::new(EventFlags::CLOSE, &[])
    }

    /// Remote abort.
    pub fn abort() -> Self {
        Self::new(EventFlags::ABORT, &[])
    }
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(0),
            state: Arc::new(Mutex::new(EngineState::default())),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Allocates a connection for a socket of type `protocol`.
    pub fn open(&self, protocol: QType) -> SharedConnection {
        let id: ConnId = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("open(): id={:?}, protocol={:?}", id, protocol);
        Arc::new(Connection::new(id, protocol))
    }

    /// Starts accepting inbound connections on `conn`.
    pub fn listen(&self, conn: &SharedConnection) {
        conn.critical_section(|cb| cb.set_listening(true));
    }

    /// Queues events to deliver on `conn` the next time its driver is notified.
    pub fn script(&self, conn: &SharedConnection, events: impl IntoIterator<Item = ScriptedEvent>) {
        lock(&self.state).scripts.entry(conn.id()).or_default().extend(events);
    }

    /// Delivers `event` on `conn` from the calling thread.
    pub fn deliver_now(&self, conn: &SharedConnection, event: ScriptedEvent) -> EventFlags {
        deliver(&self.state, conn, event)
    }

    /// Waits until every scripted event handed to the event context has been delivered.
    pub fn join(&self) {
        let workers: Vec<JoinHandle<()>> = mem::take(&mut *lock(&self.workers));
        for worker in workers {
            if worker.join().is_err() {
                error!("join(): event context panicked");
            }
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.state).deliveries.clone()
    }

    fn record(&self, call: EngineCall) {
        trace!("record(): {:?}", call);
        lock(&self.state).calls.push(call);
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkEngine for LoopbackEngine {
    fn stop_listening(&self, conn: &SharedConnection) {
        self.record(EngineCall::StopListening(conn.id()));
        conn.critical_section(|cb| cb.set_listening(false));
    }

    fn free_stream(&self, conn: &SharedConnection) {
        self.record(EngineCall::FreeStream(conn.id()));
        free(conn, QType::Stream);
    }

    fn free_datagram(&self, conn: &SharedConnection) {
        self.record(EngineCall::FreeDatagram(conn.id()));
        free(conn, QType::Datagram);
    }

    fn notify_driver(&self, conn: &SharedConnection) {
        self.record(EngineCall::NotifyDriver(conn.id()));
        let events: VecDeque<ScriptedEvent> = match lock(&self.state).scripts.remove(&conn.id()) {
            Some(events) => events,
            None => return,
        };

        let state: Arc<Mutex<EngineState>> = self.state.clone();
        let conn: SharedConnection = conn.clone();
        let worker: JoinHandle<()> = thread::spawn(move || {
            for event in events {
                deliver(&state, &conn, event);
            }
        });
        lock(&self.workers).push(worker);
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases `conn` if it was allocated for `protocol`. A connection of another protocol is left alone.
fn free(conn: &Connection, protocol: QType) {
    conn.critical_section(|cb: &mut ConnectionControlBlock| {
        if cb.protocol() != protocol {
            warn!("free(): protocol mismatch (conn={:?}, expected={:?}, found={:?})", cb.id(), protocol, cb.protocol());
            return;
        }
        cb.mark_freed();
    })
}

fn deliver(state: &Mutex<EngineState>, conn: &Connection, event: ScriptedEvent) -> EventFlags {
    let mut dev: DeliveryBuffer = DeliveryBuffer::from(event.payload);
    let flags_out: EventFlags = conn.deliver(&mut dev, event.flags);
    lock(state).deliveries.push(Delivery {
        conn: conn.id(),
        flags_in: event.flags,
        flags_out,
        payload_len: dev.len(),
    });
    flags_out
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

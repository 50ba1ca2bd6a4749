// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod qdesc;
mod qtype;

//==============================================================================
// Imports
//==============================================================================

use crate::{
    net::socket::SharedSocket,
    runtime::fail::Fail,
};
use ::slab::Slab;
use ::std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};

//==============================================================================
// Exports
//==============================================================================

pub use self::{
    qdesc::QDesc,
    qtype::QType,
};

//==============================================================================
// Traits
//==============================================================================

/// Resolves socket descriptors to sockets and gives them back.
pub trait DescriptorTable {
    /// Looks up the socket that is associated with `qd`.
    fn lookup(&self, qd: QDesc) -> Option<SharedSocket>;

    /// Drops the reference that `qd` holds on its socket.
    fn release(&self, qd: QDesc);
}

//==============================================================================
// Structures
//==============================================================================

/// Socket Descriptor Table
pub struct SocketTable {
    table: Mutex<Slab<SharedSocket>>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Socket Descriptor Tables
impl SocketTable {
    /// Creates a socket descriptor table.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Slab::new()),
        }
    }

    /// Allocates a new entry in the target [SocketTable]. The descriptor holds one reference on `socket`.
    pub fn alloc(&self, socket: SharedSocket) -> QDesc {
        socket.get_ref();
        self.reserve(socket)
    }

    /// Inserts `socket` in the target [SocketTable] without taking a reference on it.
    pub fn reserve(&self, socket: SharedSocket) -> QDesc {
        let ix: usize = self.lock().insert(socket);
        QDesc::from(ix)
    }

    /// Takes an additional reference on the socket associated with `qd`.
    pub fn dup(&self, qd: QDesc) -> Result<(), Fail> {
        match self.lock().get(qd.into()) {
            Some(socket) => {
                socket.get_ref();
                Ok(())
            },
            None => {
                let cause: String = format!("invalid socket descriptor (qd={:?})", qd);
                warn!("dup(): {}", cause);
                Err(Fail::new(libc::EBADF, &cause))
            },
        }
    }

    /// Returns the number of entries in the target [SocketTable].
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Checks whether the target [SocketTable] has no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Slab<SharedSocket>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorTable for SocketTable {
    fn lookup(&self, qd: QDesc) -> Option<SharedSocket> {
        self.lock().get(qd.into()).cloned()
    }

    /// Releases one reference. The entry is removed once no reference is left.
    fn release(&self, qd: QDesc) {
        let mut table: MutexGuard<Slab<SharedSocket>> = self.lock();
        let remaining: i32 = match table.get(qd.into()) {
            Some(socket) => socket.put_ref(),
            None => {
                warn!("release(): invalid socket descriptor (qd={:?})", qd);
                return;
            },
        };
        if remaining <= 0 {
            table.remove(qd.into());
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

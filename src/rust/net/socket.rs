// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    net::{
        conn::SharedConnection,
        flags::SocketFlags,
    },
    runtime::QType,
};
use ::std::sync::{
    atomic::{
        AtomicI32,
        AtomicU8,
        Ordering,
    },
    Arc,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// A socket and the connection that backs it.
///
/// The connected flag is shared with the event context. It should only be changed from within the critical section of
/// the socket's connection, so that checking it and acting on it cannot be split by an event.
pub struct Socket {
    qtype: QType,
    refs: AtomicI32,
    flags: AtomicU8,
    conn: SharedConnection,
}

pub type SharedSocket = Arc<Socket>;

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Socket {
    /// Creates a socket of type `qtype` on top of `conn`. The new socket holds no references.
    pub fn new(qtype: QType, conn: SharedConnection) -> Self {
        Self {
            qtype,
            refs: AtomicI32::new(0),
            flags: AtomicU8::new(SocketFlags::empty().bits()),
            conn,
        }
    }

    pub fn qtype(&self) -> QType {
        self.qtype
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.conn
    }

    pub fn refcount(&self) -> i32 {
        self.refs.load(Ordering::Acquire)
    }

    /// Takes a reference and returns the new reference count.
    pub fn get_ref(&self) -> i32 {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops a reference and returns the new reference count.
    pub fn put_ref(&self) -> i32 {
        self.refs.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub fn flags(&self) -> SocketFlags {
        SocketFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.flags().contains(SocketFlags::CONNECTED)
    }

    pub fn set_connected(&self, connected: bool) {
        self.set_flag(SocketFlags::CONNECTED, connected)
    }

    pub fn is_listening(&self) -> bool {
        self.flags().contains(SocketFlags::LISTENING)
    }

    pub fn set_listening(&self, listening: bool) {
        self.set_flag(SocketFlags::LISTENING, listening)
    }

    fn set_flag(&self, flag: SocketFlags, value: bool) {
        if value {
            self.flags.fetch_or(flag.bits(), Ordering::AcqRel);
        } else {
            self.flags.fetch_and(!flag.bits(), Ordering::AcqRel);
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::bitflags::bitflags;

//======================================================================================================================
// Structures
//======================================================================================================================

bitflags! {
    /// Events that the network engine delivers for a connection.
    pub struct EventFlags: u8 {
        /// Previously sent data was acknowledged.
        const ACKDATA = 1 << 0;
        /// New inbound data is available.
        const NEWDATA = 1 << 1;
        /// Data must be retransmitted.
        const REXMIT = 1 << 2;
        /// Periodic poll.
        const POLL = 1 << 3;
        /// The remote host closed the connection. When returned to the engine, requests a close.
        const CLOSE = 1 << 4;
        /// The remote host aborted the connection.
        const ABORT = 1 << 5;
        /// The connection was established.
        const CONNECTED = 1 << 6;
        /// The connection timed out.
        const TIMEDOUT = 1 << 7;
    }
}

bitflags! {
    /// Socket state flags.
    pub struct SocketFlags: u8 {
        const CONNECTED = 1 << 0;
        const LISTENING = 1 << 1;
    }
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl EventFlags {
    /// Events after which no further protocol traffic is expected.
    pub const TERMINAL: EventFlags =
        EventFlags::from_bits_truncate(EventFlags::CLOSE.bits() | EventFlags::ABORT.bits());

    /// Checks whether the target flag set carries a terminal event.
    pub fn is_terminal(&self) -> bool {
        self.intersects(Self::TERMINAL)
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

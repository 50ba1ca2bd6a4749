// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    close::{
        callback::on_close_event,
        rendezvous::{
            CloseWaiter,
            Rendezvous,
        },
    },
    net::{
        conn::{
            ConnectionControlBlock,
            SharedConnection,
        },
        engine::NetworkEngine,
        flags::EventFlags,
        socket::SharedSocket,
    },
};
use ::std::time::Duration;

//======================================================================================================================
// Constants
//======================================================================================================================

/// Events that a closing connection listens to.
const CLOSE_INTEREST: EventFlags = EventFlags::from_bits_truncate(
    EventFlags::NEWDATA.bits() | EventFlags::CLOSE.bits() | EventFlags::ABORT.bits(),
);

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Breaks the current connection of a stream socket, if any, and returns once it is gone.
///
/// Without a `linger` deadline this blocks until the engine reports that the peer closed or aborted the connection,
/// which may never happen with an unresponsive peer. When the deadline elapses, the wait is abandoned and the
/// connection is left for the engine to tear down.
pub fn disconnect<E: NetworkEngine + ?Sized>(socket: &SharedSocket, engine: &E, linger: Option<Duration>) {
    let conn: &SharedConnection = socket.connection();

    // Checking the connection state and installing the waiter must not be split by an event.
    let rendezvous: Option<Rendezvous> = conn.critical_section(|cb: &mut ConnectionControlBlock| {
        if !socket.is_connected() {
            return None;
        }

        let (rendezvous, waiter): (Rendezvous, CloseWaiter) = Rendezvous::new(socket.clone());
        if cb.install_event_hooks(Box::new(waiter), CLOSE_INTEREST, on_close_event).is_some() {
            warn!("disconnect(): replaced pending event hooks (conn={:?})", cb.id());
        }
        Some(rendezvous)
    });

    let rendezvous: Rendezvous = match rendezvous {
        Some(rendezvous) => rendezvous,
        None => {
            debug!("disconnect(): not connected (conn={:?})", conn.id());
            return;
        },
    };

    // Outside the critical section: NetworkEngine::notify_driver only schedules work and never runs the handler.
    engine.notify_driver(conn);

    // Wait for the disconnect event.
    match rendezvous.wait(linger) {
        Ok(()) => trace!("disconnect(): disconnected (conn={:?})", conn.id()),
        Err(e) => warn!("disconnect(): giving up on graceful disconnect (conn={:?}): {:?}", conn.id(), e),
    }
    drop(rendezvous);

    // We are now disconnected.
    conn.critical_section(|cb: &mut ConnectionControlBlock| {
        cb.clear_event_hooks();
        socket.set_connected(false);
    });
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

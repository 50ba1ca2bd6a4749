// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    close::rendezvous::CloseWaiter,
    net::{
        conn::{
            ConnectionControlBlock,
            DeliveryBuffer,
        },
        flags::EventFlags,
    },
};

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Event handler for a connection that is waiting to be disconnected. Runs in event context.
///
/// A terminal event completes the rendezvous: hooks are removed and the closing task is woken up. Any other event is
/// steered towards a close: inbound data is dropped and the engine is asked to close instead.
pub fn on_close_event(dev: &mut DeliveryBuffer, cb: &mut ConnectionControlBlock, flags: EventFlags) -> EventFlags {
    trace!("on_close_event(): conn={:?}, flags={:02x}", cb.id(), flags.bits());

    if cb.private_data::<CloseWaiter>().is_none() {
        return flags;
    }

    if flags.is_terminal() {
        // The disconnection is complete.
        if let Some(Ok(waiter)) = cb.clear_event_hooks().map(|private| private.downcast::<CloseWaiter>()) {
            let waiter: CloseWaiter = *waiter;
            waiter.socket().set_connected(false);
            waiter.signal();
            debug!("on_close_event(): resuming (conn={:?})", cb.id());
        }
        flags
    } else {
        dev.discard();
        (flags & !EventFlags::NEWDATA) | EventFlags::CLOSE
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

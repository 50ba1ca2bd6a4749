// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    net::socket::SharedSocket,
    runtime::fail::Fail,
};
use ::crossbeam_channel::{
    self,
    Receiver,
    RecvTimeoutError,
    Sender,
    TrySendError,
};
use ::std::time::Duration;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Event-context half of a close rendezvous. It lives in the private-data slot of the connection being closed.
pub struct CloseWaiter {
    /// Socket that is being closed.
    socket: SharedSocket,
    signal: Sender<()>,
}

/// Task-context half of a close rendezvous.
pub struct Rendezvous {
    signal: Receiver<()>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl CloseWaiter {
    pub fn socket(&self) -> &SharedSocket {
        &self.socket
    }

    /// Wakes up the closing task. Consumes the waiter, so this happens at most once. Never blocks.
    pub fn signal(self) -> bool {
        match self.signal.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(())) => {
                debug!("signal(): closing task is no longer waiting");
                false
            },
            Err(TrySendError::Full(())) => {
                warn!("signal(): rendezvous was already signaled");
                false
            },
        }
    }
}

impl Rendezvous {
    /// Creates a rendezvous for closing `socket`. The handle starts unsignaled.
    pub fn new(socket: SharedSocket) -> (Self, CloseWaiter) {
        let (tx, rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);
        (Self { signal: rx }, CloseWaiter { socket, signal: tx })
    }

    /// Blocks until the waiter is signaled. Without a `deadline` this may block forever.
    pub fn wait(&self, deadline: Option<Duration>) -> Result<(), Fail> {
        let result: Result<(), RecvTimeoutError> = match deadline {
            Some(timeout) => self.signal.recv_timeout(timeout),
            None => self.signal.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match result {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                let cause: String = "timed out waiting for disconnect".to_string();
                warn!("wait(): {}", cause);
                Err(Fail::new(libc::ETIMEDOUT, &cause))
            },
            Err(RecvTimeoutError::Disconnected) => {
                let cause: String = "waiter was dropped without being signaled".to_string();
                warn!("wait(): {}", cause);
                Err(Fail::new(libc::ECANCELED, &cause))
            },
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

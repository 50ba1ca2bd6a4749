// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod callback;
mod disconnect;
mod rendezvous;

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    net::{
        conn::SharedConnection,
        engine::NetworkEngine,
        socket::SharedSocket,
    },
    runtime::{
        fail::Fail,
        queue::{
            DescriptorTable,
            QDesc,
            QType,
        },
    },
};
use ::std::time::Duration;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::{
    callback::on_close_event,
    disconnect::disconnect,
    rendezvous::{
        CloseWaiter,
        Rendezvous,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Options for closing a socket.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CloseOptions {
    /// How long to wait for a connected stream socket to be disconnected. `None` waits for as long as it takes.
    pub linger: Option<Duration>,
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Closes the socket behind `qd`, waiting for as long as it takes to break its connection.
pub fn close<T, E>(table: &T, engine: &E, qd: QDesc) -> Result<(), Fail>
where
    T: DescriptorTable + ?Sized,
    E: NetworkEngine + ?Sized,
{
    close_with(table, engine, qd, &CloseOptions::default())
}

/// Closes the socket behind `qd`.
///
/// Fails with `EBADF` if `qd` does not refer to a referenced socket of a supported type. Nothing is torn down in that
/// case. Otherwise, the engine resources of the socket are released, the descriptor is released, and the call
/// succeeds.
pub fn close_with<T, E>(table: &T, engine: &E, qd: QDesc, options: &CloseOptions) -> Result<(), Fail>
where
    T: DescriptorTable + ?Sized,
    E: NetworkEngine + ?Sized,
{
    let socket: SharedSocket = match table.lookup(qd) {
        Some(socket) if socket.refcount() > 0 => socket,
        _ => {
            let cause: String = format!("invalid socket descriptor (qd={:?})", qd);
            warn!("close(): {}", cause);
            return Err(Fail::new(libc::EBADF, &cause));
        },
    };
    trace!("close(): qd={:?}, qtype={:?}", qd, socket.qtype());

    let conn: &SharedConnection = socket.connection();
    match socket.qtype() {
        QType::Stream => {
            // No longer accepting connections.
            engine.stop_listening(conn);
            socket.set_listening(false);
            disconnect(&socket, engine, options.linger);
            engine.free_stream(conn);
        },
        QType::Datagram => engine.free_datagram(conn),
        qtype => {
            let cause: String = format!("cannot close socket of type {:?} (qd={:?})", qtype, qd);
            warn!("close(): {}", cause);
            return Err(Fail::new(libc::EBADF, &cause));
        },
    }

    table.release(qd);
    Ok(())
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

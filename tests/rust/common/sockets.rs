// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::netclose::{
    net::conn::SharedConnection,
    LoopbackEngine,
    QDesc,
    QType,
    SharedSocket,
    Socket,
    SocketTable,
};
use ::std::sync::Arc;

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Opens a socket of type `qtype` on `engine` and registers it in `table`.
pub fn open_socket(
    engine: &LoopbackEngine,
    table: &SocketTable,
    qtype: QType,
    connected: bool,
) -> (SharedSocket, QDesc) {
    let conn: SharedConnection = engine.open(qtype);
    let socket: SharedSocket = Arc::new(Socket::new(qtype, conn));
    socket.set_connected(connected);
    let qd: QDesc = table.alloc(socket.clone());
    (socket, qd)
}

/// Checks whether event hooks are installed on the connection of `socket`.
pub fn is_hooked(socket: &SharedSocket) -> bool {
    socket.connection().critical_section(|cb| cb.has_event_hooks())
}

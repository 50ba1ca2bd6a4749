// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::net::conn::SharedConnection;

//======================================================================================================================
// Traits
//======================================================================================================================

/// Network engine operations that socket teardown relies on.
pub trait NetworkEngine {
    /// Stops accepting new inbound connections on `conn`.
    fn stop_listening(&self, conn: &SharedConnection);

    /// Releases the resources of a stream connection.
    fn free_stream(&self, conn: &SharedConnection);

    /// Releases the resources of a datagram connection.
    fn free_datagram(&self, conn: &SharedConnection);

    /// Tells the driver that `conn` has outbound work pending.
    ///
    /// Implementations must only schedule work here. Events for `conn` must be delivered later, from the event
    /// context, and never from within this call.
    fn notify_driver(&self, conn: &SharedConnection);
}

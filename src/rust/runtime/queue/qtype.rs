// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Structures
//==============================================================================

/// Protocol type of a socket.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum QType {
    /// Connection-based socket.
    Stream,
    /// Connectionless socket.
    Datagram,
    /// Raw socket.
    Raw,
}

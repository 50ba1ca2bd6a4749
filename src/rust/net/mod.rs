// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod conn;
pub mod engine;
pub mod flags;
pub mod loopback;
pub mod socket;

pub use self::{
    conn::{
        Connection,
        ConnectionControlBlock,
        DeliveryBuffer,
        SharedConnection,
    },
    flags::{
        EventFlags,
        SocketFlags,
    },
};

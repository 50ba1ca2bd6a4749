// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod config;
pub mod fail;
pub mod logging;
pub mod queue;

pub use self::{
    fail::Fail,
    queue::{
        QDesc,
        QType,
    },
};

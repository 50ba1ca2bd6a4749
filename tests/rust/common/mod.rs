// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod sockets;

//======================================================================================================================
// Imports
//======================================================================================================================

use ::netclose::runtime::logging;

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Common setup for all tests.
pub fn setup() {
    logging::initialize();
}

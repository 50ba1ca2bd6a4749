// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Structures
//==============================================================================

/// Socket Descriptor
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct QDesc(u32);

//==============================================================================
// Trait Implementations
//==============================================================================

impl From<QDesc> for u32 {
    /// Converts a [QDesc] to a [u32].
    fn from(val: QDesc) -> Self {
        val.0
    }
}

impl From<u32> for QDesc {
    /// Converts a [u32] to a [QDesc].
    fn from(val: u32) -> Self {
        QDesc(val)
    }
}

impl From<QDesc> for usize {
    /// Converts a [QDesc] to a [usize].
    fn from(val: QDesc) -> Self {
        val.0 as usize
    }
}

impl From<usize> for QDesc {
    /// Converts a [usize] to a [QDesc].
    fn from(val: usize) -> Self {
        QDesc(val as u32)
    }
}

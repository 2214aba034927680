// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the result store.

use crate::message::DType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("slot '{0}' already exists")]
    DuplicateSlot(String),

    #[error("slot '{0}' was never created")]
    UnknownSlot(String),

    #[error("slot '{name}' holds {expected} values, got {actual}")]
    TypeMismatch {
        name: String,
        expected: DType,
        actual: DType,
    },
}

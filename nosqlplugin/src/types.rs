// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared plugin types
//!
//! Error kinds produced by classification and the versioned record format
//! that conditional writes operate on.

use super::error::NoSqlResult;
use serde::{Deserialize, Serialize};

/// Engine-meaningful outcome of classifying a failed operation
///
/// Derived on demand from an error value through
/// [`NoSqlDb::classify`](crate::NoSqlDb::classify). Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested row/item does not exist
    NotFound,

    /// The backend did not answer in time, or the connection closed
    /// mid-request. Completion of the operation is uncertain.
    Timeout,

    /// The backend asked the caller to back off and retry later
    Throttled,

    /// A conditional write's precondition did not hold
    ConditionFailed,

    /// Anything the backend's classifier does not recognize
    Unknown,
}

impl ErrorKind {
    /// Timeout and Throttled are transient; the engine may retry them with
    /// backoff. ConditionFailed requires re-reading state first.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Throttled)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Throttled => "throttled",
            ErrorKind::ConditionFailed => "condition_failed",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A stored value together with its write version
///
/// Versions start at [`VersionedValue::INITIAL_VERSION`] and grow by one on
/// every successful write of the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    pub version: u64,
    pub data: Vec<u8>,
}

impl VersionedValue {
    pub const INITIAL_VERSION: u64 = 1;

    pub fn new(data: Vec<u8>) -> Self {
        Self {
            version: Self::INITIAL_VERSION,
            data,
        }
    }

    /// The value that replaces this one on the next write
    pub fn next(&self, data: Vec<u8>) -> Self {
        Self {
            version: self.version + 1,
            data,
        }
    }

    /// Encode for embedded backends that store raw bytes
    pub fn to_bytes(&self) -> NoSqlResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> NoSqlResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

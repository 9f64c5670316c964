// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plugin contract
//!
//! Every NoSQL backend driver implements [`NoSqlDb`] so the engine can treat
//! backends interchangeably. The contract has three parts: identity and
//! lifecycle, a small CRUD surface with conditional writes, and the four
//! error predicates that classify the driver's own failures.

use super::error::{NoSqlError, NoSqlResult};
use super::types::{ErrorKind, VersionedValue};

/// Backend-agnostic database handle
///
/// A value of this trait owns exactly one backend session for its whole
/// lifetime. All operations except [`plugin_name`](NoSqlDb::plugin_name) and
/// the predicates may block on I/O; callers enforce their own deadlines.
///
/// The predicates are only meaningful for errors returned by the same
/// driver. Applying them to another backend's errors gives no guarantee.
pub trait NoSqlDb: Send + Sync {
    /// Name this plugin is registered under. Constant for the instance.
    fn plugin_name(&self) -> &'static str;

    /// Release the session
    ///
    /// Safe to call any number of times. Cleanup failures are logged by the
    /// driver and never returned, so shutdown always proceeds. Callers quiesce
    /// in-flight operations before closing.
    fn close(&self);

    /// Read a row; an absent row fails with the driver's not-found error
    fn get(&self, table: &str, key: &[u8]) -> NoSqlResult<VersionedValue>;

    /// Unconditional upsert. Returns the version written.
    fn put(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<u64>;

    /// Create a row. Fails with [`NoSqlError::ConditionFailed`] if it exists.
    fn insert_if_not_exists(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<()>;

    /// Replace a row only if its current version is `expected_version`
    ///
    /// Fails with [`NoSqlError::ConditionFailed`] when the row is missing or
    /// was written by someone else since it was read.
    fn update_if_version(
        &self,
        table: &str,
        key: &[u8],
        data: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<u64>;

    /// Remove a row. Removing an absent row succeeds.
    fn delete(&self, table: &str, key: &[u8]) -> NoSqlResult<()>;

    /// Remove a row only if its current version is `expected_version`
    fn delete_if_version(&self, table: &str, key: &[u8], expected_version: u64)
        -> NoSqlResult<()>;

    /// All keys of a table, in backend order
    fn list_keys(&self, table: &str) -> NoSqlResult<Vec<Vec<u8>>>;

    fn is_not_found_error(&self, err: &NoSqlError) -> bool;

    /// No-response timeouts, connections closed mid-request and write
    /// timeouts all count: the caller cannot tell whether the write landed.
    fn is_timeout_error(&self, err: &NoSqlError) -> bool;

    fn is_throttling_error(&self, err: &NoSqlError) -> bool;

    fn is_condition_failed_error(&self, err: &NoSqlError) -> bool;

    /// Map an error to a single kind, most specific predicate first
    fn classify(&self, err: &NoSqlError) -> ErrorKind {
        if self.is_not_found_error(err) {
            ErrorKind::NotFound
        } else if self.is_condition_failed_error(err) {
            ErrorKind::ConditionFailed
        } else if self.is_timeout_error(err) {
            ErrorKind::Timeout
        } else if self.is_throttling_error(err) {
            ErrorKind::Throttled
        } else {
            ErrorKind::Unknown
        }
    }
}

impl NoSqlDb for Box<dyn NoSqlDb> {
    fn plugin_name(&self) -> &'static str {
        (**self).plugin_name()
    }

    fn close(&self) {
        (**self).close()
    }

    fn get(&self, table: &str, key: &[u8]) -> NoSqlResult<VersionedValue> {
        (**self).get(table, key)
    }

    fn put(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<u64> {
        (**self).put(table, key, data)
    }

    fn insert_if_not_exists(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<()> {
        (**self).insert_if_not_exists(table, key, data)
    }

    fn update_if_version(
        &self,
        table: &str,
        key: &[u8],
        data: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<u64> {
        (**self).update_if_version(table, key, data, expected_version)
    }

    fn delete(&self, table: &str, key: &[u8]) -> NoSqlResult<()> {
        (**self).delete(table, key)
    }

    fn delete_if_version(
        &self,
        table: &str,
        key: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<()> {
        (**self).delete_if_version(table, key, expected_version)
    }

    fn list_keys(&self, table: &str) -> NoSqlResult<Vec<Vec<u8>>> {
        (**self).list_keys(table)
    }

    fn is_not_found_error(&self, err: &NoSqlError) -> bool {
        (**self).is_not_found_error(err)
    }

    fn is_timeout_error(&self, err: &NoSqlError) -> bool {
        (**self).is_timeout_error(err)
    }

    fn is_throttling_error(&self, err: &NoSqlError) -> bool {
        (**self).is_throttling_error(err)
    }

    fn is_condition_failed_error(&self, err: &NoSqlError) -> bool {
        (**self).is_condition_failed_error(err)
    }

    fn classify(&self, err: &NoSqlError) -> ErrorKind {
        (**self).classify(err)
    }
}

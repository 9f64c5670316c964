// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cassandra plugin implementation
//!
//! Tables are expected to have the shape
//! `(key blob PRIMARY KEY, value blob, version bigint)`. Conditional writes are
//! lightweight transactions; a transaction that is not applied becomes
//! [`NoSqlError::ConditionFailed`].

use super::config::CassandraConfig;
use super::session::{Consistency, CqlConnector, CqlError, CqlSession, CqlValue, Row, Statement};
use super::PLUGIN_NAME;
use crate::config::NoSqlConfig;
use crate::error::{NoSqlError, NoSqlResult};
use crate::traits::NoSqlDb;
use crate::types::VersionedValue;
use parking_lot::RwLock;
use std::sync::Arc;

/// "Overloaded" status code of the native protocol. Drivers do not reliably
/// export a name for it, so it is compared numerically.
const ERR_OVERLOADED: u32 = 0x1001;

/// Lost races `put` absorbs before surfacing the condition failure
const MAX_PUT_ATTEMPTS: usize = 8;

/// Database handle over a Cassandra session
pub struct CassandraDb {
    session: RwLock<Option<Arc<dyn CqlSession>>>,
    consistency: Consistency,
    serial_consistency: Consistency,
}

impl CassandraDb {
    /// Wrap an already open session with default consistency levels
    pub fn new_from_session(session: Box<dyn CqlSession>) -> Self {
        Self::with_consistency(session, Consistency::LocalQuorum, Consistency::LocalSerial)
    }

    pub fn with_consistency(
        session: Box<dyn CqlSession>,
        consistency: Consistency,
        serial_consistency: Consistency,
    ) -> Self {
        Self {
            session: RwLock::new(Some(Arc::from(session))),
            consistency,
            serial_consistency,
        }
    }

    /// Open a session through `connector` and wrap it
    pub fn new_from_config(
        config: &NoSqlConfig,
        connector: &dyn CqlConnector,
    ) -> NoSqlResult<Self> {
        let cassandra_config = CassandraConfig::from_nosql_config(config)?;
        let session = connector.connect(&cassandra_config).map_err(|e| {
            NoSqlError::Connection(format!(
                "failed to connect to cassandra hosts {:?}: {}",
                cassandra_config.hosts, e
            ))
        })?;
        log::debug!(
            "Opened cassandra session to {:?} (keyspace {})",
            cassandra_config.hosts,
            cassandra_config.keyspace
        );
        Ok(Self::with_consistency(
            session,
            cassandra_config.consistency,
            cassandra_config.serial_consistency,
        ))
    }

    fn session(&self) -> NoSqlResult<Arc<dyn CqlSession>> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| native(CqlError::SessionClosed))
    }

    fn statement(&self, cql: String, values: Vec<CqlValue>) -> Statement {
        Statement::new(cql, values, self.consistency)
    }

    fn cas_statement(&self, cql: String, values: Vec<CqlValue>) -> Statement {
        Statement::new(cql, values, self.consistency)
            .with_serial_consistency(self.serial_consistency)
    }

    fn query(&self, stmt: Statement) -> NoSqlResult<Vec<Row>> {
        self.session()?.query(&stmt).map_err(native)
    }

    fn execute_cas(&self, stmt: Statement) -> NoSqlResult<()> {
        if self.session()?.execute_cas(&stmt).map_err(native)? {
            Ok(())
        } else {
            Err(NoSqlError::ConditionFailed)
        }
    }

    /// Current row, or `None` when absent
    fn read(&self, table: &str, key: &[u8]) -> NoSqlResult<Option<VersionedValue>> {
        let stmt = self.statement(
            format!("SELECT value, version FROM {} WHERE key = ?", quote(table)),
            vec![CqlValue::Blob(key.to_vec())],
        );
        match self.query(stmt)?.into_iter().next() {
            Some(row) => decode_row(row).map(Some),
            None => Ok(None),
        }
    }
}

fn native(err: CqlError) -> NoSqlError {
    NoSqlError::backend(PLUGIN_NAME, err)
}

fn native_of(err: &NoSqlError) -> Option<&CqlError> {
    err.native::<CqlError>()
}

/// Quote a table name as a CQL identifier
fn quote(table: &str) -> String {
    format!("\"{}\"", table.replace('"', "\"\""))
}

fn encode_version(version: u64) -> NoSqlResult<CqlValue> {
    i64::try_from(version)
        .map(CqlValue::BigInt)
        .map_err(|_| NoSqlError::Serialization(format!("version {} exceeds bigint", version)))
}

fn decode_row(row: Row) -> NoSqlResult<VersionedValue> {
    let mut columns = row.into_iter();
    match (columns.next(), columns.next()) {
        (Some(CqlValue::Blob(data)), Some(CqlValue::BigInt(version))) => {
            let version = u64::try_from(version).map_err(|_| {
                NoSqlError::Serialization(format!("negative row version {}", version))
            })?;
            Ok(VersionedValue { version, data })
        }
        (data, version) => Err(NoSqlError::Serialization(format!(
            "unexpected row shape: value={:?}, version={:?}",
            data, version
        ))),
    }
}

impl NoSqlDb for CassandraDb {
    fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn close(&self) {
        if let Some(session) = self.session.write().take() {
            session.close();
            log::debug!("Closed cassandra session");
        }
    }

    fn get(&self, table: &str, key: &[u8]) -> NoSqlResult<VersionedValue> {
        self.read(table, key)?
            .ok_or_else(|| native(CqlError::NotFound))
    }

    fn put(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<u64> {
        for attempt in 1..=MAX_PUT_ATTEMPTS {
            let result = match self.read(table, key)? {
                Some(current) => self.update_if_version(table, key, data, current.version),
                None => self
                    .insert_if_not_exists(table, key, data)
                    .map(|_| VersionedValue::INITIAL_VERSION),
            };

            match result {
                Err(NoSqlError::ConditionFailed) => {
                    log::debug!("put on {} lost race (attempt {})", table, attempt)
                }
                other => return other,
            }
        }
        log::warn!(
            "put on {} gave up after {} conflicting writes",
            table,
            MAX_PUT_ATTEMPTS
        );
        Err(NoSqlError::ConditionFailed)
    }

    fn insert_if_not_exists(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<()> {
        let stmt = self.cas_statement(
            format!(
                "INSERT INTO {} (key, value, version) VALUES (?, ?, ?) IF NOT EXISTS",
                quote(table)
            ),
            vec![
                CqlValue::Blob(key.to_vec()),
                CqlValue::Blob(data.to_vec()),
                encode_version(VersionedValue::INITIAL_VERSION)?,
            ],
        );
        self.execute_cas(stmt)
    }

    fn update_if_version(
        &self,
        table: &str,
        key: &[u8],
        data: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<u64> {
        let expected = encode_version(expected_version)?;
        let next_version = expected_version.checked_add(1).ok_or_else(|| {
            NoSqlError::Serialization(format!("version {} cannot be incremented", expected_version))
        })?;
        let stmt = self.cas_statement(
            format!(
                "UPDATE {} SET value = ?, version = ? WHERE key = ? IF version = ?",
                quote(table)
            ),
            vec![
                CqlValue::Blob(data.to_vec()),
                encode_version(next_version)?,
                CqlValue::Blob(key.to_vec()),
                expected,
            ],
        );
        self.execute_cas(stmt)?;
        Ok(next_version)
    }

    fn delete(&self, table: &str, key: &[u8]) -> NoSqlResult<()> {
        let stmt = self.statement(
            format!("DELETE FROM {} WHERE key = ?", quote(table)),
            vec![CqlValue::Blob(key.to_vec())],
        );
        self.query(stmt)?;
        Ok(())
    }

    fn delete_if_version(
        &self,
        table: &str,
        key: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<()> {
        let stmt = self.cas_statement(
            format!("DELETE FROM {} WHERE key = ? IF version = ?", quote(table)),
            vec![
                CqlValue::Blob(key.to_vec()),
                encode_version(expected_version)?,
            ],
        );
        self.execute_cas(stmt)
    }

    fn list_keys(&self, table: &str) -> NoSqlResult<Vec<Vec<u8>>> {
        let stmt = self.statement(format!("SELECT key FROM {}", quote(table)), Vec::new());
        self.query(stmt)?
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(CqlValue::Blob(key)) => Ok(key),
                other => Err(NoSqlError::Serialization(format!(
                    "unexpected key column: {:?}",
                    other
                ))),
            })
            .collect()
    }

    fn is_not_found_error(&self, err: &NoSqlError) -> bool {
        matches!(native_of(err), Some(CqlError::NotFound))
    }

    /// A connection closed mid-request counts as a timeout: the statement may
    /// or may not have been applied.
    fn is_timeout_error(&self, err: &NoSqlError) -> bool {
        matches!(
            native_of(err),
            Some(CqlError::TimeoutNoResponse)
                | Some(CqlError::ConnectionClosed)
                | Some(CqlError::WriteTimeout(_))
        )
    }

    fn is_throttling_error(&self, err: &NoSqlError) -> bool {
        native_of(err).and_then(CqlError::code) == Some(ERR_OVERLOADED)
    }

    fn is_condition_failed_error(&self, err: &NoSqlError) -> bool {
        err.is_condition_failed()
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory plugin for testing
//!
//! Keeps tables in process memory and lets tests queue native failures with
//! [`MemorySession::inject_fault`], so retry paths in the engine can be
//! exercised without a cluster.

use crate::config::NoSqlConfig;
use crate::error::{NoSqlError, NoSqlResult};
use crate::registry::PluginRegistry;
use crate::traits::NoSqlDb;
use crate::types::VersionedValue;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const PLUGIN_NAME: &str = "memory";

/// Status code the memory backend uses for "overloaded, retry later"
pub const OVERLOADED_CODE: u32 = 0x1001;

/// Native error vocabulary of the memory backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("not found")]
    NotFound,

    #[error("no response received before timeout")]
    Timeout,

    #[error("connection closed while waiting for response")]
    ConnectionClosed,

    #[error("request error {code:#06x}: {message}")]
    Request { code: u32, message: String },

    #[error("session has been closed")]
    SessionClosed,
}

impl MemoryError {
    pub fn overloaded() -> Self {
        MemoryError::Request {
            code: OVERLOADED_CODE,
            message: "overloaded, retry later".to_string(),
        }
    }
}

type Table = BTreeMap<Vec<u8>, VersionedValue>;

struct SessionState {
    tables: RwLock<HashMap<String, Table>>,
    faults: Mutex<VecDeque<MemoryError>>,
    closed: AtomicBool,
}

/// Shared in-memory "cluster"
///
/// Clones are handles to the same data, which lets a test keep a handle for
/// fault injection after giving the session to a [`MemoryDb`].
#[derive(Clone)]
pub struct MemorySession {
    state: Arc<SessionState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SessionState {
                tables: RwLock::new(HashMap::new()),
                faults: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Make the next operation fail with `fault`. Faults are consumed in
    /// the order they were injected.
    pub fn inject_fault(&self, fault: MemoryError) {
        self.state.faults.lock().push_back(fault);
    }

    pub fn pending_faults(&self) -> usize {
        self.state.faults.lock().len()
    }

    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Admission check run before every operation
    fn begin(&self) -> Result<(), MemoryError> {
        if self.is_closed() {
            return Err(MemoryError::SessionClosed);
        }
        match self.state.faults.lock().pop_front() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

/// Database handle over a [`MemorySession`]
pub struct MemoryDb {
    session: RwLock<Option<MemorySession>>,
}

impl MemoryDb {
    pub fn new_from_session(session: MemorySession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    /// Every call creates an isolated session; memory never fails to connect
    pub fn new_from_config(_config: &NoSqlConfig) -> NoSqlResult<Self> {
        Ok(Self::new_from_session(MemorySession::new()))
    }

    fn session(&self) -> NoSqlResult<MemorySession> {
        let session = self
            .session
            .read()
            .clone()
            .ok_or_else(|| native(MemoryError::SessionClosed))?;
        session.begin().map_err(native)?;
        Ok(session)
    }
}

fn native(err: MemoryError) -> NoSqlError {
    NoSqlError::backend(PLUGIN_NAME, err)
}

fn native_of(err: &NoSqlError) -> Option<&MemoryError> {
    err.native::<MemoryError>()
}

impl NoSqlDb for MemoryDb {
    fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn close(&self) {
        if let Some(session) = self.session.write().take() {
            session.close();
            log::debug!("Closed memory session");
        }
    }

    fn get(&self, table: &str, key: &[u8]) -> NoSqlResult<VersionedValue> {
        let session = self.session()?;
        let tables = session.state.tables.read();
        tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned()
            .ok_or_else(|| native(MemoryError::NotFound))
    }

    fn put(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<u64> {
        let session = self.session()?;
        let mut tables = session.state.tables.write();
        let rows = tables.entry(table.to_string()).or_default();

        let value = match rows.get(key) {
            Some(current) => current.next(data.to_vec()),
            None => VersionedValue::new(data.to_vec()),
        };
        let version = value.version;
        rows.insert(key.to_vec(), value);
        Ok(version)
    }

    fn insert_if_not_exists(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<()> {
        let session = self.session()?;
        let mut tables = session.state.tables.write();
        let rows = tables.entry(table.to_string()).or_default();

        if rows.contains_key(key) {
            return Err(NoSqlError::ConditionFailed);
        }
        rows.insert(key.to_vec(), VersionedValue::new(data.to_vec()));
        Ok(())
    }

    fn update_if_version(
        &self,
        table: &str,
        key: &[u8],
        data: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<u64> {
        let session = self.session()?;
        let mut tables = session.state.tables.write();
        let current = tables.get_mut(table).and_then(|rows| rows.get_mut(key));

        match current {
            Some(value) if value.version == expected_version => {
                *value = value.next(data.to_vec());
                Ok(value.version)
            }
            _ => Err(NoSqlError::ConditionFailed),
        }
    }

    fn delete(&self, table: &str, key: &[u8]) -> NoSqlResult<()> {
        let session = self.session()?;
        if let Some(rows) = session.state.tables.write().get_mut(table) {
            rows.remove(key);
        }
        Ok(())
    }

    fn delete_if_version(
        &self,
        table: &str,
        key: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<()> {
        let session = self.session()?;
        let mut tables = session.state.tables.write();
        let rows = tables.get_mut(table).ok_or(NoSqlError::ConditionFailed)?;

        if rows.get(key).map(|value| value.version) != Some(expected_version) {
            return Err(NoSqlError::ConditionFailed);
        }
        rows.remove(key);
        Ok(())
    }

    fn list_keys(&self, table: &str) -> NoSqlResult<Vec<Vec<u8>>> {
        let session = self.session()?;
        let tables = session.state.tables.read();
        Ok(tables
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn is_not_found_error(&self, err: &NoSqlError) -> bool {
        matches!(native_of(err), Some(MemoryError::NotFound))
    }

    fn is_timeout_error(&self, err: &NoSqlError) -> bool {
        matches!(
            native_of(err),
            Some(MemoryError::Timeout) | Some(MemoryError::ConnectionClosed)
        )
    }

    fn is_throttling_error(&self, err: &NoSqlError) -> bool {
        matches!(
            native_of(err),
            Some(MemoryError::Request { code, .. }) if *code == OVERLOADED_CODE
        )
    }

    fn is_condition_failed_error(&self, err: &NoSqlError) -> bool {
        err.is_condition_failed()
    }
}

/// Register the memory plugin
pub fn register(registry: &mut PluginRegistry) -> NoSqlResult<()> {
    registry.register(PLUGIN_NAME, |config| {
        Ok(Box::new(MemoryDb::new_from_config(config)?) as Box<dyn NoSqlDb>)
    })
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled plugin implementation
//!
//! Each table is a sled tree. Rows are bincode-encoded [`VersionedValue`]s,
//! and every conditional write is a sled `compare_and_swap` whose failure is
//! normalized into [`NoSqlError::ConditionFailed`].

use crate::config::NoSqlConfig;
use crate::error::{NoSqlError, NoSqlResult};
use crate::registry::PluginRegistry;
use crate::traits::NoSqlDb;
use crate::types::VersionedValue;
use parking_lot::RwLock;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const PLUGIN_NAME: &str = "sled";

/// Native error vocabulary of the sled plugin
#[derive(Error, Debug)]
pub enum SledError {
    #[error("row not found")]
    NotFound,

    #[error("session has been closed")]
    SessionClosed,

    #[error(transparent)]
    Sled(#[from] ::sled::Error),
}

/// Typed sled settings derived from [`NoSqlConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct SledConfig {
    pub path: Option<PathBuf>,
    pub cache_capacity: Option<u64>,
    pub flush_every_ms: Option<u64>,
    /// Remove the data directory when the database is dropped
    pub temporary: bool,
}

impl SledConfig {
    pub fn from_nosql_config(config: &NoSqlConfig) -> NoSqlResult<Self> {
        let temporary = config.option::<bool>("temporary")?.unwrap_or(false);
        if config.data_dir.is_none() && !temporary {
            return Err(NoSqlError::InvalidConfig(
                "sled requires data_dir unless option 'temporary' is set".to_string(),
            ));
        }

        Ok(Self {
            path: config.data_dir.clone(),
            cache_capacity: config.option::<u64>("cache_capacity")?,
            flush_every_ms: config.option::<u64>("flush_every_ms")?,
            temporary,
        })
    }

    fn open(&self) -> Result<::sled::Db, ::sled::Error> {
        let mut sled_config = ::sled::Config::new().temporary(self.temporary);
        if let Some(path) = &self.path {
            sled_config = sled_config.path(path);
        }
        if let Some(capacity) = self.cache_capacity {
            sled_config = sled_config.cache_capacity(capacity);
        }
        if self.flush_every_ms.is_some() {
            sled_config = sled_config.flush_every_ms(self.flush_every_ms);
        }
        sled_config.open()
    }
}

/// Database handle over a sled instance
pub struct SledDb {
    session: RwLock<Option<::sled::Db>>,
}

impl SledDb {
    pub fn new_from_session(session: ::sled::Db) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    pub fn new_from_config(config: &NoSqlConfig) -> NoSqlResult<Self> {
        let sled_config = SledConfig::from_nosql_config(config)?;
        let session = sled_config.open().map_err(|e| {
            NoSqlError::Connection(format!(
                "failed to open sled at {:?}: {}",
                sled_config.path, e
            ))
        })?;
        log::debug!("Opened sled session at {:?}", sled_config.path);
        Ok(Self::new_from_session(session))
    }

    fn tree(&self, table: &str) -> NoSqlResult<::sled::Tree> {
        let session = self
            .session
            .read()
            .clone()
            .ok_or_else(|| native(SledError::SessionClosed))?;
        session.open_tree(table).map_err(native)
    }
}

fn native(err: impl Into<SledError>) -> NoSqlError {
    NoSqlError::backend(PLUGIN_NAME, err.into())
}

fn native_of(err: &NoSqlError) -> Option<&SledError> {
    err.native::<SledError>()
}

/// Normalize sled's compare-and-swap outcome
fn cas_outcome<E>(result: Result<(), E>) -> NoSqlResult<()> {
    result.map_err(|_| NoSqlError::ConditionFailed)
}

impl NoSqlDb for SledDb {
    fn plugin_name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn close(&self) {
        let Some(session) = self.session.write().take() else {
            return;
        };
        if let Err(e) = session.flush() {
            log::warn!("Failed to flush sled session on close: {}", e);
        }
        log::debug!("Closed sled session");
    }

    fn get(&self, table: &str, key: &[u8]) -> NoSqlResult<VersionedValue> {
        let tree = self.tree(table)?;
        match tree.get(key).map_err(native)? {
            Some(bytes) => VersionedValue::from_bytes(&bytes),
            None => Err(native(SledError::NotFound)),
        }
    }

    fn put(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<u64> {
        let tree = self.tree(table)?;
        loop {
            let current = tree.get(key).map_err(native)?;
            let value = match &current {
                Some(bytes) => VersionedValue::from_bytes(bytes)?.next(data.to_vec()),
                None => VersionedValue::new(data.to_vec()),
            };

            let swapped = tree
                .compare_and_swap(key, current, Some(value.to_bytes()?))
                .map_err(native)?;
            if swapped.is_ok() {
                return Ok(value.version);
            }
            // Lost a race with another writer; retry on the fresh value
        }
    }

    fn insert_if_not_exists(&self, table: &str, key: &[u8], data: &[u8]) -> NoSqlResult<()> {
        let tree = self.tree(table)?;
        let value = VersionedValue::new(data.to_vec());
        let result = tree
            .compare_and_swap(key, None::<&[u8]>, Some(value.to_bytes()?))
            .map_err(native)?;
        cas_outcome(result)
    }

    fn update_if_version(
        &self,
        table: &str,
        key: &[u8],
        data: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<u64> {
        let tree = self.tree(table)?;
        let current = tree
            .get(key)
            .map_err(native)?
            .ok_or(NoSqlError::ConditionFailed)?;

        let existing = VersionedValue::from_bytes(&current)?;
        if existing.version != expected_version {
            return Err(NoSqlError::ConditionFailed);
        }

        let value = existing.next(data.to_vec());
        let result = tree
            .compare_and_swap(key, Some(current), Some(value.to_bytes()?))
            .map_err(native)?;
        cas_outcome(result)?;
        Ok(value.version)
    }

    fn delete(&self, table: &str, key: &[u8]) -> NoSqlResult<()> {
        self.tree(table)?.remove(key).map_err(native)?;
        Ok(())
    }

    fn delete_if_version(
        &self,
        table: &str,
        key: &[u8],
        expected_version: u64,
    ) -> NoSqlResult<()> {
        let tree = self.tree(table)?;
        let current = tree
            .get(key)
            .map_err(native)?
            .ok_or(NoSqlError::ConditionFailed)?;

        if VersionedValue::from_bytes(&current)?.version != expected_version {
            return Err(NoSqlError::ConditionFailed);
        }

        let result = tree
            .compare_and_swap(key, Some(current), None::<&[u8]>)
            .map_err(native)?;
        cas_outcome(result)
    }

    fn list_keys(&self, table: &str) -> NoSqlResult<Vec<Vec<u8>>> {
        self.tree(table)?
            .iter()
            .keys()
            .map(|key| key.map(|k| k.to_vec()).map_err(native))
            .collect()
    }

    fn is_not_found_error(&self, err: &NoSqlError) -> bool {
        matches!(native_of(err), Some(SledError::NotFound))
    }

    /// Sled is embedded: only I/O that timed out counts
    fn is_timeout_error(&self, err: &NoSqlError) -> bool {
        matches!(
            native_of(err),
            Some(SledError::Sled(::sled::Error::Io(e))) if e.kind() == io::ErrorKind::TimedOut
        )
    }

    /// Sled has no overload signal
    fn is_throttling_error(&self, _err: &NoSqlError) -> bool {
        false
    }

    fn is_condition_failed_error(&self, err: &NoSqlError) -> bool {
        err.is_condition_failed()
    }
}

/// Register the sled plugin
pub fn register(registry: &mut PluginRegistry) -> NoSqlResult<()> {
    registry.register(PLUGIN_NAME, |config| {
        Ok(Box::new(SledDb::new_from_config(config)?) as Box<dyn NoSqlDb>)
    })
}

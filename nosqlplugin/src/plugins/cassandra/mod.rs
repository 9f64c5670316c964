// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cassandra plugin
//!
//! The engine supplies the wire driver as a [`CqlConnector`]; this module
//! owns the statements for the contract's CRUD surface and the
//! classification of [`CqlError`]s.
//!
//! ```ignore
//! let mut registry = PluginRegistry::with_builtin_plugins()?;
//! cassandra::register(&mut registry, Arc::new(MyDriver::default()))?;
//! let db = registry.create(&config)?;
//! ```

pub mod config;
pub mod db;
pub mod session;

pub use config::CassandraConfig;
pub use db::CassandraDb;
pub use session::{
    Consistency, CqlConnector, CqlError, CqlSession, CqlValue, RequestError, Row, Statement,
    WriteTimeoutError,
};

use crate::error::NoSqlResult;
use crate::registry::PluginRegistry;
use crate::traits::NoSqlDb;
use std::sync::Arc;

pub const PLUGIN_NAME: &str = "cassandra";

/// Register the Cassandra plugin, opening sessions through `connector`
pub fn register(
    registry: &mut PluginRegistry,
    connector: Arc<dyn CqlConnector>,
) -> NoSqlResult<()> {
    registry.register(PLUGIN_NAME, move |config| {
        let db = CassandraDb::new_from_config(config, connector.as_ref())?;
        Ok(Box::new(db) as Box<dyn NoSqlDb>)
    })
}

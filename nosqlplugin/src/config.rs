// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plugin configuration
//!
//! [`NoSqlConfig`] is the flat configuration every plugin constructor
//! receives. Each backend converts it into its own typed config and rejects
//! the fields it cannot use.

use super::error::{NoSqlError, NoSqlResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default connect timeout when none is configured
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Configuration for one NoSQL datastore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoSqlConfig {
    /// Registry name of the plugin that serves this datastore
    pub plugin_name: String,

    /// Comma-separated seed hosts, `host` or `host:port`
    #[serde(default)]
    pub hosts: String,

    /// Port used for hosts that do not name one. 0 means the plugin default.
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub keyspace: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Data directory for embedded backends
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound on connections per host. 0 means the plugin default.
    #[serde(default)]
    pub max_conns: usize,

    /// Plugin-specific settings
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl NoSqlConfig {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            hosts: String::new(),
            port: 0,
            keyspace: String::new(),
            user: String::new(),
            password: String::new(),
            data_dir: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_conns: 0,
            options: HashMap::new(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> NoSqlResult<Self> {
        let config: NoSqlConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NoSqlResult<()> {
        if self.plugin_name.trim().is_empty() {
            return Err(NoSqlError::InvalidConfig(
                "plugin_name must not be empty".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(NoSqlError::InvalidConfig(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Look up a plugin option and parse it
    pub fn option<T>(&self, name: &str) -> NoSqlResult<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.options.get(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                NoSqlError::InvalidConfig(format!("option '{}' = '{}': {}", name, raw, e))
            }),
        }
    }

    pub fn with_hosts(mut self, hosts: impl Into<String>) -> Self {
        self.hosts = hosts.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

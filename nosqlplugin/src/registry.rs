// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plugin registry
//!
//! Associates plugin names with constructors so the engine can pick a
//! backend at startup from configuration. The registry is an explicit value
//! built once during process initialization and handed to whatever selects
//! the backend; there is no process-global plugin map.
//!
//! Registering a name twice is rejected with [`NoSqlError::DuplicatePlugin`].

use super::config::NoSqlConfig;
use super::error::{NoSqlError, NoSqlResult};
use super::traits::NoSqlDb;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a database handle from configuration
pub type PluginConstructor =
    Arc<dyn Fn(&NoSqlConfig) -> NoSqlResult<Box<dyn NoSqlDb>> + Send + Sync>;

/// Name-to-constructor map of available backends
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginConstructor>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Create a registry with the embedded backends registered
    ///
    /// Backends that need an engine-supplied session (Cassandra) are added
    /// separately with their own `register` function.
    pub fn with_builtin_plugins() -> NoSqlResult<Self> {
        let mut registry = Self::new();
        crate::plugins::memory::register(&mut registry)?;
        #[cfg(feature = "sled-backend")]
        crate::plugins::sled::register(&mut registry)?;
        Ok(registry)
    }

    /// Register a constructor under `name`
    pub fn register<F>(&mut self, name: &str, ctor: F) -> NoSqlResult<()>
    where
        F: Fn(&NoSqlConfig) -> NoSqlResult<Box<dyn NoSqlDb>> + Send + Sync + 'static,
    {
        self.register_constructor(name, Arc::new(ctor))
    }

    /// Register an already shared constructor under `name`
    pub fn register_constructor(
        &mut self,
        name: &str,
        ctor: PluginConstructor,
    ) -> NoSqlResult<()> {
        if self.plugins.contains_key(name) {
            log::warn!("Rejected duplicate registration of NoSQL plugin '{}'", name);
            return Err(NoSqlError::DuplicatePlugin(name.to_string()));
        }
        self.plugins.insert(name.to_string(), ctor);
        log::info!("Registered NoSQL plugin: {}", name);
        Ok(())
    }

    /// Find the constructor registered under `name`
    pub fn lookup(&self, name: &str) -> NoSqlResult<PluginConstructor> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| NoSqlError::PluginNotRegistered(name.to_string()))
    }

    /// Construct the backend named by `config.plugin_name`
    pub fn create(&self, config: &NoSqlConfig) -> NoSqlResult<Box<dyn NoSqlDb>> {
        config.validate()?;
        let ctor = self.lookup(&config.plugin_name)?;
        log::debug!("Creating NoSQL plugin '{}'", config.plugin_name);

        let db = ctor(config)?;
        if db.plugin_name() != config.plugin_name {
            log::warn!(
                "Plugin registered as '{}' reports name '{}'",
                config.plugin_name,
                db.plugin_name()
            );
            db.close();
            return Err(NoSqlError::InvalidConfig(format!(
                "plugin registered as '{}' reports name '{}'",
                config.plugin_name,
                db.plugin_name()
            )));
        }
        Ok(db)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered names, sorted
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

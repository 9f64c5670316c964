// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the NoSQL plugin layer
//!
//! Drivers never rewrite a backend-native failure. They box it into
//! [`NoSqlError::Backend`] together with their plugin name, and the driver's
//! own classifier answers "is this error of kind K" by downcasting to its
//! native error types.

use thiserror::Error;

/// Boxed backend-native error carried by [`NoSqlError::Backend`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum NoSqlError {
    /// Process-wide condition-failure sentinel.
    ///
    /// Every conditional write returns exactly this variant when its
    /// precondition (row absence, expected version) does not hold, whatever
    /// the backend's own compare-and-swap vocabulary looks like.
    #[error("internal condition fail error")]
    ConditionFailed,

    /// Failure reported by the backend, kept in its native form
    #[error("{plugin} backend error: {source}")]
    Backend {
        plugin: &'static str,
        #[source]
        source: BoxError,
    },

    /// Session could not be established at construction time
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Plugin not registered: {0}")]
    PluginNotRegistered(String),

    #[error("Duplicate plugin: {0}")]
    DuplicatePlugin(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NoSqlError {
    /// Wrap a native error raised by the named plugin
    pub fn backend<E>(plugin: &'static str, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        NoSqlError::Backend {
            plugin,
            source: err.into(),
        }
    }

    /// Identity check against the condition-failure sentinel
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, NoSqlError::ConditionFailed)
    }

    /// Name of the plugin that produced a backend error
    pub fn plugin(&self) -> Option<&'static str> {
        match self {
            NoSqlError::Backend { plugin, .. } => Some(plugin),
            _ => None,
        }
    }

    /// Borrow the native error if it is of type `E`
    pub fn native<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            NoSqlError::Backend { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<bincode::Error> for NoSqlError {
    fn from(err: bincode::Error) -> Self {
        NoSqlError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for NoSqlError {
    fn from(err: serde_json::Error) -> Self {
        NoSqlError::Serialization(err.to_string())
    }
}

pub type NoSqlResult<T> = Result<T, NoSqlError>;

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! NoSQL plugin layer for the workflow engine's persistence
//!
//! The engine performs durable state mutations through [`NoSqlDb`] without
//! knowing which NoSQL backend sits underneath. Each backend driver
//! classifies its own native failures into the small set of outcomes the
//! engine's retry logic cares about.
//!
//! # Architecture
//!
//! ```text
//! Engine persistence managers
//!     ↓
//! PluginRegistry (name → constructor)
//!     ↓
//! NoSqlDb (CRUD, conditional writes, error predicates)
//!     ↓
//! Concrete plugins (Cassandra, Sled, Memory)
//! ```
//!
//! # Error classification
//!
//! | Kind            | Engine reaction                         |
//! |-----------------|-----------------------------------------|
//! | NotFound        | surface to caller                       |
//! | Timeout         | retry with backoff (completion unknown) |
//! | Throttled       | retry with backoff                      |
//! | ConditionFailed | re-read state, recompute the write      |
//! | Unknown         | fail                                    |
//!
//! # Example Usage
//!
//! ```ignore
//! use nosqlplugin::{NoSqlConfig, NoSqlDb, PluginRegistry, ErrorKind};
//!
//! let registry = PluginRegistry::with_builtin_plugins()?;
//! let db = registry.create(&NoSqlConfig::new("sled").with_data_dir("./data"))?;
//!
//! match db.update_if_version("shards", b"7", b"owner", 3) {
//!     Ok(version) => println!("now at {}", version),
//!     Err(e) => match db.classify(&e) {
//!         ErrorKind::ConditionFailed => { /* reload shard */ }
//!         kind if kind.is_transient() => { /* back off */ }
//!         _ => return Err(e.into()),
//!     },
//! }
//! db.close();
//! ```

pub mod config;
pub mod error;
pub mod plugins;
pub mod registry;
pub mod traits;
pub mod types;

pub use config::NoSqlConfig;
pub use error::{NoSqlError, NoSqlResult};
pub use registry::{PluginConstructor, PluginRegistry};
pub use traits::NoSqlDb;
pub use types::{ErrorKind, VersionedValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test utilities for nosqlplugin integration tests
//!
//! - `init_logging`: route `log` output through env_logger
//! - `FakeCluster`: in-process Cassandra stand-in that understands the
//!   statements the Cassandra plugin issues, with fault injection
//! - `FakeConnector`: opens `FakeCluster` sessions for a set of reachable hosts

#![allow(dead_code)]

use nosqlplugin::plugins::cassandra::{
    CassandraConfig, CqlConnector, CqlError, CqlSession, CqlValue, Row, Statement,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type Table = BTreeMap<Vec<u8>, (Vec<u8>, i64)>;

#[derive(Default)]
struct ClusterState {
    tables: Mutex<HashMap<String, Table>>,
    faults: Mutex<VecDeque<CqlError>>,
    closed: AtomicBool,
    closes: AtomicUsize,
}

/// Shared fake cluster; clones see the same data
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<ClusterState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_fault(&self, fault: CqlError) {
        self.state.faults.lock().push_back(fault);
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Number of times a session on this cluster was closed
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), CqlError> {
        if self.is_closed() {
            return Err(CqlError::SessionClosed);
        }
        match self.state.faults.lock().pop_front() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

/// Extract the quoted table name following `marker`
fn table_of(cql: &str, marker: &str) -> String {
    let rest = cql.split(marker).nth(1).unwrap_or_default().trim_start();
    let quoted = rest.strip_prefix('"').unwrap_or(rest);
    let end = quoted.find("\" ").or_else(|| quoted.rfind('"')).unwrap_or(quoted.len());
    quoted[..end].replace("\"\"", "\"")
}

fn blob(value: &CqlValue) -> Vec<u8> {
    match value {
        CqlValue::Blob(b) => b.clone(),
        other => panic!("expected blob, got {:?}", other),
    }
}

fn bigint(value: &CqlValue) -> i64 {
    match value {
        CqlValue::BigInt(v) => *v,
        other => panic!("expected bigint, got {:?}", other),
    }
}

impl CqlSession for FakeCluster {
    fn query(&self, stmt: &Statement) -> Result<Vec<Row>, CqlError> {
        self.begin()?;
        let mut tables = self.state.tables.lock();
        let cql = stmt.cql.as_str();

        if cql.starts_with("SELECT value, version") {
            let table = tables.entry(table_of(cql, "FROM")).or_default();
            Ok(table
                .get(&blob(&stmt.values[0]))
                .map(|(value, version)| {
                    vec![CqlValue::Blob(value.clone()), CqlValue::BigInt(*version)]
                })
                .into_iter()
                .collect())
        } else if cql.starts_with("SELECT key") {
            let table = tables.entry(table_of(cql, "FROM")).or_default();
            Ok(table.keys().map(|k| vec![CqlValue::Blob(k.clone())]).collect())
        } else if cql.starts_with("DELETE") {
            let table = tables.entry(table_of(cql, "FROM")).or_default();
            table.remove(&blob(&stmt.values[0]));
            Ok(Vec::new())
        } else {
            panic!("unexpected query: {}", cql)
        }
    }

    fn execute_cas(&self, stmt: &Statement) -> Result<bool, CqlError> {
        self.begin()?;
        let mut tables = self.state.tables.lock();
        let cql = stmt.cql.as_str();
        let v = &stmt.values;

        if cql.starts_with("INSERT") {
            let table = tables.entry(table_of(cql, "INTO")).or_default();
            let key = blob(&v[0]);
            if table.contains_key(&key) {
                return Ok(false);
            }
            table.insert(key, (blob(&v[1]), bigint(&v[2])));
            Ok(true)
        } else if cql.starts_with("UPDATE") {
            let table = tables.entry(table_of(cql, "UPDATE")).or_default();
            match table.get_mut(&blob(&v[2])) {
                Some(row) if row.1 == bigint(&v[3]) => {
                    *row = (blob(&v[0]), bigint(&v[1]));
                    Ok(true)
                }
                _ => Ok(false),
            }
        } else if cql.starts_with("DELETE") {
            let table = tables.entry(table_of(cql, "FROM")).or_default();
            let key = blob(&v[0]);
            match table.get(&key) {
                Some(row) if row.1 == bigint(&v[1]) => {
                    table.remove(&key);
                    Ok(true)
                }
                _ => Ok(false),
            }
        } else {
            panic!("unexpected lightweight transaction: {}", cql)
        }
    }

    fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connects to a `FakeCluster` if any configured host is reachable
pub struct FakeConnector {
    pub cluster: FakeCluster,
    pub reachable: Vec<String>,
}

impl FakeConnector {
    pub fn new(reachable: &[&str]) -> Self {
        Self {
            cluster: FakeCluster::new(),
            reachable: reachable.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl CqlConnector for FakeConnector {
    fn connect(&self, config: &CassandraConfig) -> Result<Box<dyn CqlSession>, CqlError> {
        if config.hosts.iter().any(|h| self.reachable.contains(h)) {
            Ok(Box::new(self.cluster.clone()))
        } else {
            Err(CqlError::NoConnections)
        }
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Contract tests run against every plugin through the registry
//!
//! Each backend is created by name from configuration and must satisfy the
//! same guarantees: a stable plugin name, idempotent close, single-predicate
//! classification of its own not-found and condition-failed paths.

#![cfg(feature = "sled-backend")]

mod testutils;

use nosqlplugin::plugins::cassandra;
use nosqlplugin::{ErrorKind, NoSqlConfig, NoSqlDb, NoSqlError, PluginRegistry};
use std::sync::Arc;
use testutils::{init_logging, FakeCluster, FakeConnector};

fn registry() -> PluginRegistry {
    registry_with_cluster().0
}

/// Registry plus the fake cluster behind its Cassandra plugin
fn registry_with_cluster() -> (PluginRegistry, FakeCluster) {
    init_logging();
    let mut registry = PluginRegistry::with_builtin_plugins().expect("builtin plugins");
    let connector = FakeConnector::new(&["127.0.0.1:9042"]);
    let cluster = connector.cluster.clone();
    cassandra::register(&mut registry, Arc::new(connector)).expect("cassandra plugin");
    (registry, cluster)
}

/// Configurations for every registered backend
fn configs(dir: &std::path::Path) -> Vec<NoSqlConfig> {
    let mut cassandra = NoSqlConfig::new("cassandra").with_hosts("127.0.0.1");
    cassandra.keyspace = "workflow".to_string();

    vec![
        NoSqlConfig::new("memory"),
        NoSqlConfig::new("sled").with_data_dir(dir.join("sled")),
        cassandra,
    ]
}

fn predicates(db: &dyn NoSqlDb, err: &NoSqlError) -> [bool; 4] {
    [
        db.is_not_found_error(err),
        db.is_timeout_error(err),
        db.is_throttling_error(err),
        db.is_condition_failed_error(err),
    ]
}

#[test]
fn test_plugin_name_matches_registration() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();

    for config in configs(temp_dir.path()) {
        let db = registry.create(&config).expect("create plugin");
        assert_eq!(db.plugin_name(), config.plugin_name);
        db.put("history", b"k", b"v").expect("put");
        assert_eq!(db.plugin_name(), config.plugin_name);
        db.close();
        assert_eq!(db.plugin_name(), config.plugin_name);
    }
}

#[test]
fn test_not_found_is_exclusive() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();

    for config in configs(temp_dir.path()) {
        let db = registry.create(&config).expect("create plugin");
        let err = db.get("executions", b"no-such-workflow").unwrap_err();
        assert_eq!(
            predicates(db.as_ref(), &err),
            [true, false, false, false],
            "plugin {}",
            config.plugin_name
        );
        assert_eq!(db.classify(&err), ErrorKind::NotFound);
        db.close();
    }
}

#[test]
fn test_sentinel_recognized_by_every_plugin() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();
    let lookalike = NoSqlError::backend(
        "memory",
        std::io::Error::new(std::io::ErrorKind::Other, "internal condition fail error"),
    );

    for config in configs(temp_dir.path()) {
        let db = registry.create(&config).expect("create plugin");
        assert!(db.is_condition_failed_error(&NoSqlError::ConditionFailed));
        assert!(!db.is_condition_failed_error(&lookalike));
        assert!(!db.is_condition_failed_error(&NoSqlError::Connection("x".into())));
        db.close();
    }
}

#[test]
fn test_optimistic_concurrency_flow() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();

    for config in configs(temp_dir.path()) {
        let db = registry.create(&config).expect("create plugin");
        let name = config.plugin_name.as_str();

        db.insert_if_not_exists("shards", b"1", b"host-a").expect(name);
        let err = db.insert_if_not_exists("shards", b"1", b"host-b").unwrap_err();
        assert_eq!(predicates(db.as_ref(), &err), [false, false, false, true], "{}", name);

        // Two writers read version 1; only the first wins
        let read = db.get("shards", b"1").expect(name);
        assert_eq!(read.version, 1);
        assert_eq!(db.update_if_version("shards", b"1", b"host-b", 1).expect(name), 2);
        let err = db.update_if_version("shards", b"1", b"host-c", 1).unwrap_err();
        assert_eq!(db.classify(&err), ErrorKind::ConditionFailed, "{}", name);
        assert!(!db.classify(&err).is_transient());

        // The loser re-reads and recomputes
        let fresh = db.get("shards", b"1").expect(name);
        assert_eq!(fresh.data, b"host-b");
        assert_eq!(db.update_if_version("shards", b"1", b"host-c", fresh.version).expect(name), 3);

        assert_eq!(db.put("shards", b"1", b"host-d").expect(name), 4);
        db.delete_if_version("shards", b"1", 4).expect(name);
        assert!(db.is_not_found_error(&db.get("shards", b"1").unwrap_err()));

        db.put("shards", b"2", b"x").expect(name);
        db.delete("shards", b"2").expect(name);
        db.delete("shards", b"2").expect(name);
        assert!(db.list_keys("shards").expect(name).is_empty());
        db.close();
    }
}

#[test]
fn test_close_is_idempotent() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();

    for config in configs(temp_dir.path()) {
        let db = registry.create(&config).expect("create plugin");
        db.close();
        db.close();

        // Operations after close fail without classifying as retryable
        let err = db.get("executions", b"k").unwrap_err();
        assert_eq!(db.classify(&err), ErrorKind::Unknown, "{}", config.plugin_name);
    }
}

#[test]
fn test_concurrent_conditional_writers() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let registry = registry();

    for config in configs(temp_dir.path()) {
        let db: Arc<Box<dyn NoSqlDb>> = Arc::new(registry.create(&config).expect("create plugin"));
        db.put("counters", b"c", b"0").expect("seed");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let mut wins = 0;
                    for _ in 0..25 {
                        loop {
                            let current = db.get("counters", b"c").expect("read");
                            match db.update_if_version("counters", b"c", b"n", current.version) {
                                Ok(_) => {
                                    wins += 1;
                                    break;
                                }
                                Err(e) if db.is_condition_failed_error(&e) => continue,
                                Err(e) => panic!("unexpected error: {}", e),
                            }
                        }
                    }
                    wins
                })
            })
            .collect();

        let wins: u64 = handles.into_iter().map(|h| h.join().expect("writer")).sum();
        assert_eq!(wins, 100);
        assert_eq!(db.get("counters", b"c").expect("final").version, 101);
        db.close();
    }
}

#[test]
fn test_close_races_in_flight_operations() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (registry, cluster) = registry_with_cluster();

    for config in configs(temp_dir.path()) {
        let db: Arc<Box<dyn NoSqlDb>> = Arc::new(registry.create(&config).expect("create plugin"));
        db.put("executions", b"wf", b"0").expect("seed");

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let mut failures = Vec::new();
                    for _ in 0..50 {
                        let result = db.get("executions", b"wf").and_then(|current| {
                            db.update_if_version("executions", b"wf", b"n", current.version)
                        });
                        if let Err(e) = result {
                            failures.push(db.classify(&e));
                        }
                    }
                    failures
                })
            })
            .collect();
        let closers: Vec<_> = (0..3)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.close())
            })
            .collect();

        for closer in closers {
            closer.join().expect("closer");
        }
        for worker in workers {
            for kind in worker.join().expect("worker") {
                assert!(
                    matches!(kind, ErrorKind::Unknown | ErrorKind::ConditionFailed),
                    "plugin {} failed with {}",
                    config.plugin_name,
                    kind
                );
            }
        }

        let err = db.get("executions", b"wf").unwrap_err();
        assert_eq!(db.classify(&err), ErrorKind::Unknown, "{}", config.plugin_name);
        db.close();
    }
    assert_eq!(cluster.close_count(), 1);
}

#[test]
fn test_registry_lookup_errors() {
    let mut registry = registry();
    assert!(matches!(
        registry.lookup("dynamodb"),
        Err(NoSqlError::PluginNotRegistered(_))
    ));
    assert!(matches!(
        registry.register("sled", |_| Err(NoSqlError::Connection("never".into()))),
        Err(NoSqlError::DuplicatePlugin(_))
    ));
    assert_eq!(registry.plugin_names(), vec!["cassandra", "memory", "sled"]);
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cassandra configuration

use super::session::Consistency;
use crate::config::NoSqlConfig;
use crate::error::{NoSqlError, NoSqlResult};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_MAX_CONNS: usize = 2;
pub const DEFAULT_PROTOCOL_VERSION: u8 = 4;

/// Typed Cassandra settings derived from [`NoSqlConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct CassandraConfig {
    /// Seed hosts normalized to `host:port`
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub user: String,
    pub password: String,
    pub consistency: Consistency,
    pub serial_consistency: Consistency,
    pub connect_timeout: Duration,
    pub max_conns: usize,
    pub protocol_version: u8,
}

impl CassandraConfig {
    /// Validate and convert
    ///
    /// Host-list problems are connection errors: the cluster cannot be
    /// reached with them. Everything else is [`NoSqlError::InvalidConfig`].
    pub fn from_nosql_config(config: &NoSqlConfig) -> NoSqlResult<Self> {
        let port = if config.port == 0 { DEFAULT_PORT } else { config.port };
        let hosts = parse_hosts(&config.hosts, port).map_err(NoSqlError::Connection)?;

        if config.keyspace.trim().is_empty() {
            return Err(NoSqlError::InvalidConfig(
                "cassandra requires a keyspace".to_string(),
            ));
        }

        let protocol_version = config
            .option::<u8>("protocol_version")?
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        if !(3..=5).contains(&protocol_version) {
            return Err(NoSqlError::InvalidConfig(format!(
                "unsupported protocol version {}",
                protocol_version
            )));
        }

        let serial_consistency = config
            .option::<Consistency>("serial_consistency")?
            .unwrap_or(Consistency::LocalSerial);
        if !serial_consistency.is_serial() {
            return Err(NoSqlError::InvalidConfig(format!(
                "serial_consistency must be SERIAL or LOCAL_SERIAL, got {}",
                serial_consistency
            )));
        }

        Ok(Self {
            hosts,
            keyspace: config.keyspace.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            consistency: config
                .option::<Consistency>("consistency")?
                .unwrap_or(Consistency::LocalQuorum),
            serial_consistency,
            connect_timeout: config.connect_timeout(),
            max_conns: if config.max_conns == 0 {
                DEFAULT_MAX_CONNS
            } else {
                config.max_conns
            },
            protocol_version,
        })
    }
}

/// Split a comma-separated host list into `host:port` entries
///
/// Accepts `host`, `host:port`, bare IPv6 addresses and `[v6]:port`.
pub fn parse_hosts(raw: &str, default_port: u16) -> Result<Vec<String>, String> {
    let hosts = raw
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| parse_host(h, default_port))
        .collect::<Result<Vec<_>, _>>()?;

    if hosts.is_empty() {
        return Err("no cassandra hosts configured".to_string());
    }
    Ok(hosts)
}

fn parse_host(raw: &str, default_port: u16) -> Result<String, String> {
    if raw.chars().any(char::is_whitespace) {
        return Err(format!("invalid host '{}'", raw));
    }

    let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
        let (addr, tail) = rest
            .split_once(']')
            .ok_or_else(|| format!("unterminated IPv6 address '{}'", raw))?;
        let port = match tail {
            "" => default_port,
            _ => parse_port(raw, tail.strip_prefix(':').unwrap_or(tail))?,
        };
        (format!("[{}]", addr), port)
    } else {
        match raw.matches(':').count() {
            0 => (raw.to_string(), default_port),
            1 => {
                let (host, port) = raw.split_once(':').unwrap_or((raw, ""));
                (host.to_string(), parse_port(raw, port)?)
            }
            _ => (format!("[{}]", raw), default_port),
        }
    };

    if host.is_empty() || host == "[]" {
        return Err(format!("invalid host '{}'", raw));
    }
    Ok(format!("{}:{}", host, port))
}

fn parse_port(raw: &str, port: &str) -> Result<u16, String> {
    match port.parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(format!("invalid port in host '{}'", raw)),
    }
}

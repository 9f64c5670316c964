// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cassandra session contract
//!
//! The wire driver (connection pool, protocol framing, host discovery) lives
//! outside this crate. It plugs in through [`CqlConnector`] and
//! [`CqlSession`] and reports failures with [`CqlError`], which mirrors the
//! error vocabulary of the native protocol drivers.

use super::config::CassandraConfig;
use thiserror::Error;

/// Protocol status code carried by write-timeout errors
pub const WRITE_TIMEOUT_CODE: u32 = 0x1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl Consistency {
    pub fn is_serial(&self) -> bool {
        matches!(self, Consistency::Serial | Consistency::LocalSerial)
    }
}

impl std::str::FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ANY" => Ok(Consistency::Any),
            "ONE" => Ok(Consistency::One),
            "TWO" => Ok(Consistency::Two),
            "THREE" => Ok(Consistency::Three),
            "QUORUM" => Ok(Consistency::Quorum),
            "ALL" => Ok(Consistency::All),
            "LOCAL_QUORUM" => Ok(Consistency::LocalQuorum),
            "EACH_QUORUM" => Ok(Consistency::EachQuorum),
            "SERIAL" => Ok(Consistency::Serial),
            "LOCAL_SERIAL" => Ok(Consistency::LocalSerial),
            "LOCAL_ONE" => Ok(Consistency::LocalOne),
            _ => Err(format!("unknown consistency level: {}", s)),
        }
    }
}

impl std::fmt::Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        };
        write!(f, "{}", name)
    }
}

/// Bound value or result column
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Blob(Vec<u8>),
    BigInt(i64),
    Text(String),
    Boolean(bool),
    Null,
}

/// One result row, columns in SELECT order
pub type Row = Vec<CqlValue>;

/// A statement with positional bind values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub cql: String,
    pub values: Vec<CqlValue>,
    pub consistency: Consistency,
    /// Consistency of the Paxos phase for lightweight transactions
    pub serial_consistency: Option<Consistency>,
}

impl Statement {
    pub fn new(cql: impl Into<String>, values: Vec<CqlValue>, consistency: Consistency) -> Self {
        Self {
            cql: cql.into(),
            values,
            consistency,
            serial_consistency: None,
        }
    }

    pub fn with_serial_consistency(mut self, serial: Consistency) -> Self {
        self.serial_consistency = Some(serial);
        self
    }
}

/// Coordinator gave up waiting for replica acknowledgements
#[derive(Error, Debug, Clone, PartialEq)]
#[error("write timeout: {message} ({consistency}, {received}/{block_for} acks, {write_type})")]
pub struct WriteTimeoutError {
    pub message: String,
    pub consistency: Consistency,
    pub received: i32,
    pub block_for: i32,
    pub write_type: String,
}

/// Server-side error frame
#[derive(Error, Debug, Clone, PartialEq)]
#[error("request error {code:#06x}: {message}")]
pub struct RequestError {
    pub code: u32,
    pub message: String,
}

/// Native error vocabulary of Cassandra sessions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CqlError {
    /// A read that expected a row found none
    #[error("not found")]
    NotFound,

    #[error("no response received from cassandra within timeout period")]
    TimeoutNoResponse,

    #[error("connection closed waiting for response")]
    ConnectionClosed,

    #[error("no connections available to any host")]
    NoConnections,

    #[error("session has been closed")]
    SessionClosed,

    #[error(transparent)]
    WriteTimeout(#[from] WriteTimeoutError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

impl CqlError {
    /// Protocol status code of server-side errors
    pub fn code(&self) -> Option<u32> {
        match self {
            CqlError::WriteTimeout(_) => Some(WRITE_TIMEOUT_CODE),
            CqlError::Request(e) => Some(e.code),
            _ => None,
        }
    }
}

/// Live connection pool to a cluster
///
/// Implementations must be safe for concurrent use by independent callers.
pub trait CqlSession: Send + Sync {
    /// Run a statement and return its rows. No matching row is an empty
    /// result, not an error.
    fn query(&self, stmt: &Statement) -> Result<Vec<Row>, CqlError>;

    /// Run a lightweight transaction and report whether it was applied
    fn execute_cas(&self, stmt: &Statement) -> Result<bool, CqlError>;

    fn close(&self);
}

/// Opens sessions from configuration
pub trait CqlConnector: Send + Sync {
    fn connect(&self, config: &CassandraConfig) -> Result<Box<dyn CqlSession>, CqlError>;
}

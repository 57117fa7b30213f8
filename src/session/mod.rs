//! The database collaborator interface (spec §6): a narrow seam between
//! the pipeline and whatever wide-column store sits on the other end of
//! the wire, mirroring the teacher's own split between `Session` traits
//! and driver-specific detail (auth, TLS, datacenter pinning) kept out
//! of the pipeline entirely.

pub mod factory;
pub mod protocol;
pub mod testing;
pub mod tls;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConnectionSettings;
use crate::Result;

/// A single cell's value, typed as the wire protocol and the action
/// drivers need it - enough variants to cover the column types the spec's
/// scenarios exercise, not a full type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    Text(String),
    Int(i64),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(v) | ColumnValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One row returned by a query, addressed by column name.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: BTreeMap<String, ColumnValue>,
}

impl Row {
    pub fn new(columns: BTreeMap<String, ColumnValue>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns.get(name)
    }

    /// Convenience accessor for `count(*)`-shaped result rows.
    pub fn count(&self) -> Option<i64> {
        self.columns.get("count").and_then(ColumnValue::as_i64)
    }

    pub fn columns(&self) -> &BTreeMap<String, ColumnValue> {
        &self.columns
    }
}

/// An open connection against one keyspace, capable of running CQL-like
/// queries and returning typed rows. Implementations hide everything
/// about auth, TLS, and datacenter pinning from the pipeline.
#[async_trait]
pub trait Session: Send + Sync {
    async fn execute(&self, query: &str) -> Result<Vec<Row>>;
}

/// Builds [`Session`]s against a given host. Splitting this out from
/// `Session` itself is what lets a worker re-resolve and reconnect to a
/// different host after a connection failure without rebuilding its TLS
/// configuration each time.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self, conn: &ConnectionSettings, keyspace: &str) -> Result<Arc<dyn Session>>;
}

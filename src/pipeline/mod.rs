//! The bounded producer/consumer pipeline (spec §2-§5): splitter, mapper,
//! worker pool and supervisor, wired together with the typed channels
//! from [`crate::queues`].

pub mod mapper;
pub mod splitter;
pub mod supervisor;
pub mod worker;

pub use supervisor::{run_pipeline, PipelineHandles};

use std::collections::BTreeMap;

use crate::session::ColumnValue;
use crate::token::TokenRange;

/// Which parser a worker applies to a row before it goes on `resultsQ`
/// (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Extracts the `count` column from a `select count(*)` response.
    Count,
    /// Projects `key` (and `extraKey`, when configured) out of each row.
    RowProjection,
}

/// The per-action work assignment the mapper receives exactly once at
/// startup (spec §3 "Mapper task").
#[derive(Debug, Clone)]
pub struct MapperTask {
    pub query_template: String,
    pub key: String,
    pub extra_key: Option<String>,
    pub parser: ParserKind,
}

/// What a worker should do with a task once it has a concrete query
/// string (spec §3 "Worker task").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Select,
    Delete,
    Update,
}

/// A concrete, ready-to-execute query bound to the split it came from.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    pub query: String,
    pub split: TokenRange,
    pub kind: TaskKind,
    pub parser: ParserKind,
}

/// A parsed value extracted from one row, shaped by which [`ParserKind`]
/// produced it.
#[derive(Debug, Clone)]
pub enum ParsedValue {
    Count(i64),
    Row(BTreeMap<String, ColumnValue>),
}

/// One item on `resultsQ`: the originating split plus its parsed value
/// (spec §3 "Result").
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub split: TokenRange,
    pub value: ParsedValue,
}

/// Applies a [`ParserKind`] to one row returned by a worker's query.
pub fn parse_row(
    parser: ParserKind,
    row: &crate::session::Row,
    key: &str,
    extra_key: Option<&str>,
) -> Option<ParsedValue> {
    match parser {
        ParserKind::Count => row.count().map(ParsedValue::Count),
        ParserKind::RowProjection => {
            let mut projection = BTreeMap::new();
            projection.insert(key.to_string(), row.get(key)?.clone());
            if let Some(extra) = extra_key {
                projection.insert(extra.to_string(), row.get(extra)?.clone());
            }
            Some(ParsedValue::Row(projection))
        }
    }
}

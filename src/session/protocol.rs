//! Wire protocol spoken to the target cluster's query endpoint.
//!
//! Adapted from the teacher's `network::protocol` request/response pair
//! (`Request::Query { sql }` / `Response::QueryResult(..)` over
//! length-prefixed `bincode`), generalized to the column-typed rows a
//! wide-column store returns rather than the teacher's `Vec<Vec<String>>`
//! grid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::session::ColumnValue;

/// Maximum query length accepted, mirroring the teacher's
/// `MAX_SQL_LENGTH` guard against unbounded request bodies.
pub const MAX_QUERY_LENGTH: usize = 1_048_576;

/// Maximum encoded response size accepted from the server.
pub const MAX_FRAME_SIZE: usize = 16_777_216;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Query { cql: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Rows(Vec<WireRow>),
    Error(String),
}

/// A single row on the wire: column name to typed value. `Row` (in
/// `session::mod`) wraps this with the accessor methods the `Session`
/// trait's callers actually use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRow {
    pub columns: BTreeMap<String, ColumnValue>,
}

/// Encode a request as a length-prefixed `bincode` frame.
pub fn encode_request(req: &Request) -> crate::Result<Vec<u8>> {
    encode_framed(req)
}

fn encode_framed<T: Serialize>(value: &T) -> crate::Result<Vec<u8>> {
    let body = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| crate::TriremeError::Serialization(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(crate::TriremeError::Serialization(format!(
            "encoded frame of {} bytes exceeds {} byte limit",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }
    let mut framed = Vec::with_capacity(body.len() + 4);
    framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Decode a value previously produced by [`encode_framed`] from a raw
/// (unframed) byte slice - used once the caller has already read the
/// length-prefixed body off the wire.
pub fn decode_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> crate::Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(body, bincode::config::standard())
        .map_err(|e| crate::TriremeError::Parse(e.to_string()))?;
    Ok(value)
}

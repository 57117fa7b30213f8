//! Scripted [`Session`]/[`SessionFactory`] fakes, public (not
//! `#[cfg(test)]`-gated) so both this crate's unit tests and the
//! workspace's `tests/` integration tests can drive a pipeline run
//! without a real cluster on the other end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::ConnectionSettings;
use crate::error::{Result, TriremeError};
use crate::session::{Row, Session, SessionFactory};

/// A query handler a test registers to answer one shape of query. Matched
/// in registration order against a substring of the incoming CQL.
pub type QueryHandler = Box<dyn Fn(&str) -> Result<Vec<Row>> + Send + Sync>;

/// A `Session` whose responses are entirely scripted by the test that
/// built it - no network, no real keyspace.
#[derive(Default)]
pub struct ScriptedSession {
    handlers: Mutex<Vec<(String, QueryHandler)>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler invoked for the first query containing
    /// `contains` as a substring (case-insensitive).
    pub fn on(self, contains: &str, handler: QueryHandler) -> Self {
        self.handlers
            .lock()
            .unwrap()
            .push((contains.to_lowercase(), handler));
        self
    }

    /// Every query string this session has executed, in order - used by
    /// tests to assert on the CQL a delete/update action actually sent.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute(&self, query: &str) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(query.to_string());
        let lower = query.to_lowercase();
        let handlers = self.handlers.lock().unwrap();
        for (needle, handler) in handlers.iter() {
            if lower.contains(needle.as_str()) {
                return handler(query);
            }
        }
        Ok(Vec::new())
    }
}

/// Builds one [`ScriptedSession`] per `connect` call from a template
/// closure, and can be told to fail the first N connection attempts -
/// used to exercise the supervisor's reconnect-with-replacement path
/// (spec §4.5 `WorkerExit::ConnectFailure`).
pub struct ScriptedSessionFactory {
    build: Box<dyn Fn() -> ScriptedSession + Send + Sync>,
    connect_failures_remaining: AtomicUsize,
}

impl ScriptedSessionFactory {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> ScriptedSession + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            connect_failures_remaining: AtomicUsize::new(0),
        }
    }

    /// Makes the next `n` calls to `connect` fail before succeeding.
    pub fn fail_next_connects(self, n: usize) -> Self {
        self.connect_failures_remaining.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn connect(&self, _conn: &ConnectionSettings, _keyspace: &str) -> Result<Arc<dyn Session>> {
        let remaining = self.connect_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures_remaining
                .fetch_sub(1, Ordering::SeqCst);
            return Err(TriremeError::Connect("scripted connection failure".into()));
        }
        Ok(Arc::new((self.build)()))
    }
}

//! Action drivers (spec §4.5): each assembles a [`MapperTask`] query
//! template, starts the pipeline, and consumes `resultsQ` in a way
//! specific to the action (count, print, delete, update, plus the
//! supplemented `find-nulls` and `find-wide-partitions`).

pub mod count;
pub mod delete;
pub mod find_nulls;
pub mod find_wide_partitions;
pub mod print;
pub mod update;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConnectionSettings, RuntimeSettings};
use crate::pipeline::supervisor::{run_pipeline, PipelineHandles};
use crate::pipeline::MapperTask;
use crate::session::SessionFactory;

/// Everything an action driver needs to start and drive one pipeline
/// run - built once in `main` and shared across the action functions.
#[derive(Clone)]
pub struct ActionContext {
    pub settings: Arc<RuntimeSettings>,
    pub conn: Arc<ConnectionSettings>,
    pub factory: Arc<dyn SessionFactory>,
}

impl ActionContext {
    /// Starts the pipeline and hands it the one mapper task this run
    /// will ever process (spec §9 "mapper single-assignment"). A SIGINT
    /// watcher is armed alongside it so every action gets the same
    /// "Ctrl-C sets kill" behavior (spec §4.9 `UserAbort`) without each
    /// driver having to wire it up itself.
    pub async fn start(&self, task: MapperTask) -> crate::Result<PipelineHandles> {
        let handles = run_pipeline(self.settings.clone(), self.conn.clone(), self.factory.clone());
        handles
            .assignment_tx
            .send(task)
            .await
            .map_err(|_| crate::TriremeError::Query("mapper assignment channel closed".into()))?;

        let kill_for_sigint = handles.kill.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("received SIGINT, shutting down");
                kill_for_sigint.kill();
            }
        });

        Ok(handles)
    }
}

/// Sets `kill` and waits (briefly) for the supervisor to finish tearing
/// down every stage - called once an action driver has seen the
/// `resultsQ` sentinel and has no further use for the pipeline.
pub async fn shutdown_and_wait(handles: PipelineHandles) {
    handles.kill.kill();
    let _ = tokio::time::timeout(Duration::from_secs(2), handles.join_handle).await;
}

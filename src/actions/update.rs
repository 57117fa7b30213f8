//! `update-rows` (spec §4.5): reads matching rows, confirms, then sets
//! one column to a fixed value on each.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::pipeline::{MapperTask, ParsedValue, ParserKind, TaskKind, WorkerTask};
use crate::queues::Item;
use crate::session::ColumnValue;
use crate::util::confirm;

use super::{shutdown_and_wait, ActionContext};

#[derive(Debug)]
pub struct UpdateOutcome {
    pub matched_rows: usize,
    pub updates_issued: usize,
    pub declined: bool,
}

/// Renders the update value the way the original does: strings are
/// quoted unless they spell out a boolean literal, in which case they
/// pass through unquoted (spec §4.5 "update-rows").
fn render_update_value(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
        raw.to_lowercase()
    } else {
        format!("'{}'", raw)
    }
}

fn key_literal(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Text(s) => format!("'{}'", s),
        ColumnValue::Int(n) | ColumnValue::BigInt(n) => n.to_string(),
        ColumnValue::Double(d) => d.to_string(),
        ColumnValue::Boolean(b) => b.to_string(),
        ColumnValue::Timestamp(ts) => format!("'{}'", ts.to_rfc3339()),
        ColumnValue::Null => "null".to_string(),
    }
}

/// Asks for confirmation up front, then reads each row and, as it
/// arrives, enqueues its update onto `workerQ` right away - while the
/// worker pool is still live - rather than collecting the whole result
/// set and mutating only after the select pass has drained (spec §4.5:
/// "mutation tasks coexist with select tasks on `workerQ`; no ordering
/// between select and delete is guaranteed per row").
pub async fn run(
    ctx: &ActionContext,
    update_key: &str,
    update_value: &str,
) -> crate::Result<UpdateOutcome> {
    let task = MapperTask {
        query_template: format!(
            "select * from {}.{}",
            ctx.settings.keyspace, ctx.settings.table
        ),
        key: ctx.settings.key.clone(),
        extra_key: ctx.settings.extra_key.clone(),
        parser: ParserKind::RowProjection,
    };

    let mut handles = ctx.start(task).await?;

    tracing::info!(update_key, update_value, "scanning for rows to update");
    let proceed = confirm("Are you sure you want to continue?").await?;
    if !proceed {
        tracing::warn!("aborting upon user request");
        shutdown_and_wait(handles).await;
        return Ok(UpdateOutcome {
            matched_rows: 0,
            updates_issued: 0,
            declined: true,
        });
    }

    let rendered_value = render_update_value(update_value);
    let mut matched_rows = 0usize;
    let mut issued = 0usize;
    loop {
        let result = match handles.results_rx.recv().await {
            Some(Item::Data(result)) => result,
            Some(Item::EndOfStream) | None => break,
        };
        handles.stats.results_consumed.fetch_add(1, Ordering::Relaxed);
        matched_rows += 1;

        let ParsedValue::Row(ref columns) = result.value else {
            continue;
        };
        let Some(key_value) = columns.get(&ctx.settings.key) else {
            continue;
        };
        let query = format!(
            "update {}.{} set {} = {} where {} = {}",
            ctx.settings.keyspace,
            ctx.settings.table,
            update_key,
            rendered_value,
            ctx.settings.key,
            key_literal(key_value)
        );
        let worker_task = WorkerTask {
            query,
            split: result.split,
            kind: TaskKind::Update,
            parser: ParserKind::RowProjection,
        };
        if handles.worker_tx.send(Item::Data(worker_task)).await.is_err() {
            break;
        }
        handles.stats.delete_scheduled.fetch_add(1, Ordering::Relaxed);
        issued += 1;
    }

    wait_for_updates_to_drain(&handles, issued as u64).await;
    shutdown_and_wait(handles).await;

    Ok(UpdateOutcome {
        matched_rows,
        updates_issued: issued,
        declined: false,
    })
}

async fn wait_for_updates_to_drain(
    handles: &crate::pipeline::supervisor::PipelineHandles,
    expected: u64,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if handles.stats.snapshot().deleted >= expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("timed out waiting for all updates to be confirmed processed");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_literals_pass_through_unquoted() {
        assert_eq!(render_update_value("true"), "true");
        assert_eq!(render_update_value("FALSE"), "false");
    }

    #[test]
    fn other_strings_get_single_quoted() {
        assert_eq!(render_update_value("active"), "'active'");
    }
}

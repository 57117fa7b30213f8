//! `delete-rows` (spec §4.5): reads the row projection like `print-rows`,
//! then - after interactive confirmation - issues one `delete` per row.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::pipeline::{MapperTask, ParsedValue, ParserKind, TaskKind, WorkerTask};
use crate::queues::Item;
use crate::session::ColumnValue;
use crate::util::confirm;

use super::{shutdown_and_wait, ActionContext};

/// How a delete run concluded.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub matched_rows: usize,
    pub deletes_issued: usize,
    pub declined: bool,
}

/// Single-quotes every value unconditionally (spec §9 open question:
/// "source quotes every value with single quotes unconditionally,
/// including numeric and timestamp values" - preserved as observed
/// rather than switched to typed binding). Timestamps are normalised to
/// UTC RFC 3339 first (spec §4.5 "delete flow").
fn quote_for_delete(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Text(s) => format!("'{}'", s),
        ColumnValue::Int(n) | ColumnValue::BigInt(n) => format!("'{}'", n),
        ColumnValue::Double(d) => format!("'{}'", d),
        ColumnValue::Boolean(b) => format!("'{}'", b),
        ColumnValue::Timestamp(ts) => format!("'{}'", ts.to_rfc3339()),
        ColumnValue::Null => "null".to_string(),
    }
}

fn render_delete(
    keyspace: &str,
    table: &str,
    key: &str,
    extra_key: Option<&str>,
    split: crate::token::TokenRange,
    row: &std::collections::BTreeMap<String, ColumnValue>,
) -> Option<String> {
    let key_value = row.get(key)?;
    let predicate = crate::pipeline::mapper::render_token_predicate(key, extra_key, split);
    let mut where_clause = format!("{} and {} = {}", predicate, key, quote_for_delete(key_value));
    if let Some(extra) = extra_key {
        let extra_value = row.get(extra)?;
        where_clause.push_str(&format!(" and {} = {}", extra, quote_for_delete(extra_value)));
    }
    Some(format!("delete from {}.{} where {}", keyspace, table, where_clause))
}

/// Asks for confirmation up front, then reads each row and, as it arrives,
/// enqueues its delete onto `workerQ` right away - while the worker pool
/// is still live - rather than collecting the whole result set and
/// mutating only after the select pass has drained (spec §4.5: "mutation
/// tasks coexist with select tasks on `workerQ`; no ordering between
/// select and delete is guaranteed per row").
pub async fn run(ctx: &ActionContext) -> crate::Result<DeleteOutcome> {
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

    tracing::info!("scanning for rows to delete");
    let proceed = confirm("Are you sure you want to continue?").await?;
    if !proceed {
        tracing::warn!("aborting upon user request");
        shutdown_and_wait(handles).await;
        return Ok(DeleteOutcome {
            matched_rows: 0,
            deletes_issued: 0,
            declined: true,
        });
    }

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
        let Some(query) = render_delete(
            &ctx.settings.keyspace,
            &ctx.settings.table,
            &ctx.settings.key,
            ctx.settings.extra_key.as_deref(),
            result.split,
            columns,
        ) else {
            continue;
        };
        let worker_task = WorkerTask {
            query,
            split: result.split,
            kind: TaskKind::Delete,
            parser: ParserKind::RowProjection,
        };
        if handles.worker_tx.send(Item::Data(worker_task)).await.is_err() {
            break;
        }
        handles.stats.delete_scheduled.fetch_add(1, Ordering::Relaxed);
        issued += 1;
    }

    wait_for_deletes_to_drain(&handles, issued as u64).await;
    shutdown_and_wait(handles).await;

    Ok(DeleteOutcome {
        matched_rows,
        deletes_issued: issued,
        declined: false,
    })
}

async fn wait_for_deletes_to_drain(handles: &crate::pipeline::supervisor::PipelineHandles, expected: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if handles.stats.snapshot().deleted >= expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("timed out waiting for all deletes to be confirmed processed");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenRange;
    use std::collections::BTreeMap;

    #[test]
    fn quotes_every_value_unconditionally() {
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), ColumnValue::BigInt(7));
        row.insert("name".to_string(), ColumnValue::Text("eve".into()));
        let sql = render_delete("ks", "tb", "id", Some("name"), TokenRange::new(0, 10), &row).unwrap();
        assert!(sql.contains("id = '7'"));
        assert!(sql.contains("name = 'eve'"));
        assert!(sql.starts_with("delete from ks.tb where token(id, name)"));
    }

    #[test]
    fn timestamps_normalise_to_utc_rfc3339() {
        use chrono::{TimeZone, Utc};
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), ColumnValue::Int(1));
        row.insert(
            "seen_at".to_string(),
            ColumnValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        );
        let sql = render_delete("ks", "tb", "id", Some("seen_at"), TokenRange::new(0, 10), &row).unwrap();
        assert!(sql.contains("+00:00"));
    }
}

//! `find-wide-partitions` (spec §9 design note, supplemented per
//! SPEC_FULL.md §15): not part of the core pipeline, but a composition on
//! top of the `count-rows` path - repeatedly run a count-per-split pass
//! over the current hottest sub-range with a decreasing split exponent,
//! narrowing toward the widest partition each round.

use std::sync::Arc;

use crate::config::RuntimeSettings;
use crate::pipeline::{MapperTask, ParsedValue, ParserKind};
use crate::queues::Item;
use crate::token::TokenRange;

use super::{shutdown_and_wait, ActionContext};

/// Narrowing stops after this many rounds even if the range could still
/// be split further (spec §9: abstractly "repeatedly run"; a bound is
/// needed for any concrete implementation).
const DEFAULT_ROUNDS: u32 = 3;

/// How much the split exponent shrinks each round.
const EXPONENT_STEP: u32 = 2;

/// One narrowing round's outcome: the hottest split found at that
/// round's exponent, and its row count.
#[derive(Debug, Clone, Copy)]
pub struct NarrowingRound {
    pub range: TokenRange,
    pub count: i64,
    pub exponent: u32,
}

/// Runs up to [`DEFAULT_ROUNDS`] narrowing passes, each re-splitting the
/// previous round's hottest range at a smaller exponent, and returns one
/// [`NarrowingRound`] per pass actually run (coarsest first).
pub async fn run(ctx: &ActionContext) -> crate::Result<Vec<NarrowingRound>> {
    let mut rounds = Vec::new();
    let mut range = TokenRange::new(ctx.settings.min_token, ctx.settings.max_token);
    let mut exponent = ctx.settings.split_exponent;

    for _ in 0..DEFAULT_ROUNDS {
        let Some((hottest, count)) = count_per_split(ctx, range, exponent).await? else {
            break;
        };
        rounds.push(NarrowingRound {
            range: hottest,
            count,
            exponent,
        });

        let next_exponent = exponent.saturating_sub(EXPONENT_STEP).max(1);
        if hottest.width() <= 10i128.pow(next_exponent) {
            // Already down to (or below) the next round's split width;
            // re-running would just recount the same single split.
            break;
        }
        range = hottest;
        exponent = next_exponent;
    }

    Ok(rounds)
}

/// Runs one `count(*)`-per-split pass over `[range.lo, range.hi)` at
/// `exponent` and returns the split with the highest count, if any
/// results came back at all.
async fn count_per_split(
    ctx: &ActionContext,
    range: TokenRange,
    exponent: u32,
) -> crate::Result<Option<(TokenRange, i64)>> {
    let scoped_settings = Arc::new(RuntimeSettings {
        min_token: range.lo,
        max_token: range.hi,
        split_exponent: exponent,
        ..(*ctx.settings).clone()
    });
    let scoped_ctx = ActionContext {
        settings: scoped_settings,
        conn: ctx.conn.clone(),
        factory: ctx.factory.clone(),
    };

    let task = MapperTask {
        query_template: format!(
            "select count(*) from {}.{}",
            ctx.settings.keyspace, ctx.settings.table
        ),
        key: ctx.settings.key.clone(),
        extra_key: ctx.settings.extra_key.clone(),
        parser: ParserKind::Count,
    };

    let mut handles = scoped_ctx.start(task).await?;

    let mut hottest: Option<(TokenRange, i64)> = None;
    loop {
        match handles.results_rx.recv().await {
            Some(Item::Data(result)) => {
                handles
                    .stats
                    .results_consumed
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if let ParsedValue::Count(n) = result.value {
                    let replace = hottest.map(|(_, best)| n > best).unwrap_or(true);
                    if replace {
                        hottest = Some((result.split, n));
                    }
                }
            }
            Some(Item::EndOfStream) | None => break,
        }
    }

    shutdown_and_wait(handles).await;
    Ok(hottest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionSettings;
    use crate::session::testing::{ScriptedSession, ScriptedSessionFactory};
    use crate::session::ColumnValue;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn count_row(n: i64) -> crate::session::Row {
        let mut cols = BTreeMap::new();
        cols.insert("count".to_string(), ColumnValue::BigInt(n));
        crate::session::Row::new(cols)
    }

    #[tokio::test]
    async fn narrows_toward_the_split_with_the_highest_count() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            min_token: 0,
            max_token: 100,
            split_exponent: 1,
            workers: 2,
            ..RuntimeSettings::default()
        });
        let conn = Arc::new(ConnectionSettings {
            host: "localhost".into(),
            port: 9042,
            user: "cassandra".into(),
            password: "cassandra".into(),
            datacenter: None,
            tls: None,
        });
        let factory = Arc::new(ScriptedSessionFactory::new(|| {
            ScriptedSession::new().on(
                "select count",
                Box::new(|q| {
                    if q.contains(">= 50 and") {
                        Ok(vec![count_row(9)])
                    } else {
                        Ok(vec![count_row(1)])
                    }
                }),
            )
        }));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        let rounds = run(&ctx).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].range, TokenRange::new(50, 60));
        assert_eq!(rounds[0].count, 9);
    }

    #[tokio::test]
    async fn empty_range_yields_no_rounds() {
        let settings = Arc::new(RuntimeSettings {
            keyspace: "ks".into(),
            table: "tb".into(),
            key: "id".into(),
            min_token: 0,
            max_token: 10,
            split_exponent: 1,
            workers: 1,
            ..RuntimeSettings::default()
        });
        let conn = Arc::new(ConnectionSettings {
            host: "localhost".into(),
            port: 9042,
            user: "cassandra".into(),
            password: "cassandra".into(),
            datacenter: None,
            tls: None,
        });
        let factory = Arc::new(ScriptedSessionFactory::new(ScriptedSession::new));

        let ctx = ActionContext {
            settings,
            conn,
            factory,
        };

        let rounds = run(&ctx).await.unwrap();
        assert!(rounds.is_empty());
    }
}

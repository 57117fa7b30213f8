//! The splitter stage (spec §4.1): walks the token ring and enqueues one
//! split at a time onto `splitQ`, backpressured by the channel's bound.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::kill::KillObserver;
use crate::queues::{Item, StatsCounters};
use crate::token::{SplitGenerator, TokenRange};

/// Emits every split covering `[t0, t1)` at the given exponent, then one
/// sentinel, onto `split_tx`. Exits early (without a sentinel) if `kill`
/// fires while a send is blocked - the supervisor tears down the rest of
/// the pipeline via the same signal (spec §4.1 "Errors").
pub async fn run_splitter(
    t0: i64,
    t1: i64,
    exponent: u32,
    split_tx: mpsc::Sender<Item<TokenRange>>,
    stats: Arc<StatsCounters>,
    mut kill: KillObserver,
) -> crate::Result<()> {
    let generator = SplitGenerator::new(t0, t1, exponent)?;

    for split in generator {
        tokio::select! {
            _ = kill.wait() => return Ok(()),
            send_result = split_tx.send(Item::Data(split)) => {
                if send_result.is_err() {
                    // Mapper already dropped its receiver; nothing left to do.
                    return Ok(());
                }
                stats.splits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }

    let _ = split_tx.send(Item::EndOfStream).await;
    Ok(())
}

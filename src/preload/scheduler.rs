//! The preloader's batch scheduler loop.
//!
//! One task per `Preloader`, event-driven: it sleeps until a fresh enqueue
//! arms it, waits out the settle delay so a burst coalesces into one batch,
//! then drains the queue in fixed-size cycles with a cooling pause between
//! them. Batches are strictly sequential - never two in flight - so at most
//! `batch_size` remote calls run at any moment, and the cooling pause puts
//! a flat rate limit on top.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::models::UserId;

use super::fetcher::hydrate;
use super::{PreloadState, Shared};

pub(crate) async fn run(shared: Arc<Shared>) {
    loop {
        // Idle: no polling, re-armed only by a fresh enqueue.
        shared.wake.notified().await;

        // Settle delay lets a burst of preload calls form one batch.
        sleep(shared.config.settle_delay).await;

        loop {
            let (batch, epoch) = {
                let mut state = shared.lock_state();
                let batch = next_batch(&mut state, shared.config.batch_size);
                if batch.is_empty() {
                    // Emptiness check and idle transition under one lock,
                    // so a concurrent enqueue either lands in this drain or
                    // sees idle=true and re-arms us.
                    state.idle = true;
                }
                (batch, state.epoch)
            };

            if batch.is_empty() {
                break;
            }

            debug!(batch = batch.len(), "dispatching profile fetch batch");
            let results = join_all(
                batch
                    .iter()
                    .map(|subject| hydrate(shared.fetcher.as_ref(), subject)),
            )
            .await;

            {
                let mut state = shared.lock_state();
                if state.epoch == epoch {
                    for (subject, result) in batch.into_iter().zip(results) {
                        match result {
                            Ok(record) => {
                                state.ledger.clear_resolved(&subject);
                                state.cache.insert(subject, Arc::new(record));
                            }
                            Err(e) => {
                                warn!(error = %e, "profile hydration failed, suppressing retries");
                                state.ledger.mark_failed(subject);
                            }
                        }
                    }
                } else {
                    debug!("session reset during batch, discarding results");
                }
            }

            // Flat inter-batch pause regardless of queue depth.
            sleep(shared.config.cooling_interval).await;
        }
    }
}

/// Pop subjects for the next drain cycle, skipping any that resolved
/// while queued, and mark the survivors in-flight.
fn next_batch(state: &mut PreloadState, batch_size: usize) -> Vec<UserId> {
    let mut batch = Vec::with_capacity(batch_size);
    while batch.len() < batch_size {
        let Some((subject, _priority)) = state.queue.pop_front() else {
            break;
        };
        if state.cache.contains(&subject) {
            state.ledger.clear_resolved(&subject);
            continue;
        }
        state.ledger.mark_in_flight(&subject);
        batch.push(subject);
    }
    batch
}

//! Tunables for the profile preload subsystem.
//!
//! Defaults are tuned for a mobile client scrolling a feed: small batches
//! with a flat pause between them keep aggregate request rate low, and the
//! settle delay lets a burst of visible list items coalesce into one batch.

use std::time::Duration;

/// Maximum number of subjects waiting in the preload queue.
/// Beyond this the queue sheds normal-priority backlog rather than growing.
const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// Number of subjects fetched concurrently per drain cycle.
/// Bounds in-flight remote calls regardless of queue depth.
const DEFAULT_BATCH_SIZE: usize = 2;

/// Delay between the first enqueue and the first drain.
/// A feed scroll makes many preload calls within a second or two; waiting
/// lets them form one batch instead of many tiny ones.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Unconditional pause between drain cycles.
/// This is the subsystem's backpressure mechanism - a flat rate limit on
/// the remote API independent of queue depth.
const DEFAULT_COOLING_INTERVAL: Duration = Duration::from_secs(3);

/// How long a subject shed from the queue stays suppressed.
/// Absorbs re-enqueue storms from simultaneously-rendering list items.
const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(10);

/// Configuration for a `Preloader`.
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub settle_delay: Duration,
    pub cooling_interval: Duration,
    pub cool_down: Duration,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            cooling_interval: DEFAULT_COOLING_INTERVAL,
            cool_down: DEFAULT_COOL_DOWN,
        }
    }
}

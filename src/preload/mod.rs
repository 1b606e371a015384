//! Profile preloading and caching subsystem.
//!
//! UI call sites (feed scroll, comment lists, club rosters) fire
//! `Preloader::preload` for every user they are about to render. The
//! preloader deduplicates those requests, queues them by priority, and
//! hydrates profiles in small rate-limited batches so the remote API never
//! sees a request storm. Hydration is best-effort: fetch failures are
//! absorbed here and a failed subject simply stays absent from the cache.
//!
//! All state is scoped to one `Preloader` instance, owned by the auth
//! session and torn down on logout via `reset`.

mod cache;
pub mod fetcher;
mod ledger;
mod queue;
mod scheduler;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::PreloadConfig;
use crate::models::{ProfileRecord, UserId};

use cache::ProfileCache;
use ledger::RequestLedger;
use queue::{EnqueueOutcome, PreloadQueue};

pub use fetcher::{FetchError, ProfileFetcher};
pub use queue::Priority;

/// Everything the admission path and the scheduler share.
/// Critical sections are synchronous and never span an await.
pub(crate) struct PreloadState {
    pub(crate) cache: ProfileCache,
    pub(crate) ledger: RequestLedger,
    pub(crate) queue: PreloadQueue,
    /// Bumped on reset; a batch finishing under a stale epoch discards
    /// its results instead of repopulating cleared state.
    pub(crate) epoch: u64,
    /// True while the scheduler is parked waiting for work.
    pub(crate) idle: bool,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<PreloadState>,
    pub(crate) wake: Notify,
    pub(crate) fetcher: Arc<dyn ProfileFetcher>,
    pub(crate) config: PreloadConfig,
}

impl Shared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, PreloadState> {
        // State stays consistent across a panic in another holder; recover
        // rather than poison-cascade out of a fire-and-forget API.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Public handle for the preload subsystem.
///
/// Must be created inside a Tokio runtime; construction spawns the
/// scheduler task, and dropping the handle aborts it.
pub struct Preloader {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl Preloader {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self::with_config(fetcher, PreloadConfig::default())
    }

    pub fn with_config(fetcher: Arc<dyn ProfileFetcher>, config: PreloadConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PreloadState {
                cache: ProfileCache::default(),
                ledger: RequestLedger::default(),
                queue: PreloadQueue::new(config.queue_capacity),
                epoch: 0,
                idle: true,
            }),
            wake: Notify::new(),
            fetcher,
            config,
        });
        let worker = tokio::spawn(scheduler::run(Arc::clone(&shared)));
        Self { shared, worker }
    }

    /// Fire-and-forget request to hydrate a subject's profile.
    ///
    /// Never errors and never blocks on I/O. The subject is admitted only
    /// if it is not already cached, queued, in-flight, cooling down, or
    /// failed - the whole decision happens under one lock, so concurrent
    /// calls for the same subject admit it at most once.
    pub fn preload(&self, subject: UserId, priority: Priority) {
        let now = Instant::now();
        let cool_down = self.shared.config.cool_down;

        let was_idle = {
            let mut state = self.shared.lock_state();

            if state.cache.contains(&subject) {
                return;
            }
            if state.ledger.blocks_admission(&subject, now) {
                return;
            }

            match state.queue.enqueue(subject.clone(), priority) {
                EnqueueOutcome::Enqueued => {
                    state.ledger.mark_queued(subject);
                }
                EnqueueOutcome::EnqueuedEvicting(victim) => {
                    debug!(victim = %victim, "preload queue full, shedding oldest entry");
                    state.ledger.mark_cool_down(victim, now + cool_down);
                    state.ledger.mark_queued(subject);
                }
                EnqueueOutcome::Shed => {
                    // Queue is saturated with high-priority work; suppress
                    // the subject briefly so callers stop retrying it.
                    state.ledger.mark_cool_down(subject, now + cool_down);
                    return;
                }
            }

            std::mem::replace(&mut state.idle, false)
        };

        if was_idle {
            self.shared.wake.notify_one();
        }
    }

    /// Synchronous cache read. Never triggers fetching; absent covers both
    /// "never hydrated" and "hydration failed".
    pub fn get_cached(&self, subject: &UserId) -> Option<Arc<ProfileRecord>> {
        self.shared.lock_state().cache.get(subject)
    }

    /// Number of hydrated profiles currently cached.
    pub fn cached_count(&self) -> usize {
        self.shared.lock_state().cache.len()
    }

    /// Tear down all preload state atomically: cache, ledger, queue, and
    /// any in-flight batch (its results are discarded on arrival).
    /// Called on logout.
    pub fn reset(&self) {
        let mut state = self.shared.lock_state();
        let cached = state.cache.len();
        state.cache.clear();
        state.ledger.clear();
        state.queue.clear();
        state.epoch += 1;
        info!(cached, "preload session reset");
    }
}

impl Drop for Preloader {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::time::{advance, sleep};

    use crate::api::ApiError;
    use crate::models::{EducationRecord, Profile};

    use super::ledger::SubjectStatus;

    /// Configurable stand-in for the remote API.
    struct MockFetcher {
        /// How long each profile fetch takes (virtual time)
        delay: Duration,
        /// Subjects whose primary lookup errors
        fail_profiles: HashSet<UserId>,
        /// Subjects whose education lookup errors
        fail_education: HashSet<UserId>,
        /// (subject, dispatch time) per profile fetch, in call order
        calls: Mutex<Vec<(UserId, Instant)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fail_profiles: HashSet::new(),
                fail_education: HashSet::new(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_profiles(mut self, subjects: &[&str]) -> Self {
            self.fail_profiles = subjects.iter().map(|s| UserId::from(*s)).collect();
            self
        }

        fn failing_education(mut self, subjects: &[&str]) -> Self {
            self.fail_education = subjects.iter().map(|s| UserId::from(*s)).collect();
            self
        }

        fn calls(&self) -> Vec<(UserId, Instant)> {
            self.calls.lock().unwrap().clone()
        }

        fn call_subjects(&self) -> Vec<UserId> {
            self.calls().into_iter().map(|(id, _)| id).collect()
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileFetcher for MockFetcher {
        async fn fetch_profile(&self, subject: &UserId) -> Result<Profile, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((subject.clone(), Instant::now()));

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_profiles.contains(subject) {
                return Err(ApiError::ServerError("simulated outage".to_string()));
            }
            Ok(Profile {
                id: None,
                name: Some(format!("user {}", subject)),
                email: subject.as_str().to_string(),
                image: None,
                bio: None,
                created_at: Some(Utc::now()),
            })
        }

        async fn fetch_education(&self, subject: &UserId) -> Result<Vec<EducationRecord>, ApiError> {
            if self.fail_education.contains(subject) {
                return Err(ApiError::ServerError("education down".to_string()));
            }
            Ok(vec![EducationRecord {
                id: Some(1),
                school: Some("State University".to_string()),
                degree: Some("BSc".to_string()),
                field_of_study: Some("CS".to_string()),
                start_date: None,
                end_date: None,
                grade: None,
                activities: None,
                societies: None,
            }])
        }
    }

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    fn test_config() -> PreloadConfig {
        PreloadConfig::default()
    }

    fn build(fetcher: MockFetcher, config: PreloadConfig) -> (Preloader, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let preloader = Preloader::with_config(fetcher.clone(), config);
        (preloader, fetcher)
    }

    /// Let every pending timer and batch run out (virtual time).
    async fn settle() {
        sleep(Duration::from_secs(60)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_hydrates_and_caches() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        preloader.preload(uid("u1"), Priority::High);
        assert!(preloader.get_cached(&uid("u1")).is_none());

        settle().await;

        let record = preloader.get_cached(&uid("u1")).expect("hydrated");
        assert_eq!(record.profile.email, "u1");
        assert_eq!(record.education.len(), 1);
        assert_eq!(fetcher.call_subjects(), vec![uid("u1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_preloads_dispatch_once() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        // Burst of calls before anything resolves, mixed priorities.
        preloader.preload(uid("u1"), Priority::High);
        preloader.preload(uid("u1"), Priority::Normal);
        preloader.preload(uid("u1"), Priority::High);

        settle().await;

        assert_eq!(fetcher.call_subjects(), vec![uid("u1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_subject_preload_is_noop() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        preloader.preload(uid("u1"), Priority::Normal);
        settle().await;
        assert_eq!(fetcher.call_subjects().len(), 1);

        preloader.preload(uid("u1"), Priority::Normal);
        assert_eq!(preloader.shared.lock_state().queue.len(), 0);

        settle().await;
        assert_eq!(fetcher.call_subjects().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_subject_is_never_retried() {
        let (preloader, fetcher) = build(
            MockFetcher::new(Duration::from_millis(100)).failing_profiles(&["u1"]),
            test_config(),
        );

        preloader.preload(uid("u1"), Priority::High);
        settle().await;

        assert!(preloader.get_cached(&uid("u1")).is_none());
        assert_eq!(fetcher.call_subjects().len(), 1);

        // Well past any cool-down window: still suppressed.
        preloader.preload(uid("u1"), Priority::High);
        settle().await;
        preloader.preload(uid("u1"), Priority::Normal);
        settle().await;

        assert_eq!(fetcher.call_subjects().len(), 1);
        assert!(preloader.get_cached(&uid("u1")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_failure_degrades_to_empty_education() {
        let (preloader, _fetcher) = build(
            MockFetcher::new(Duration::from_millis(100)).failing_education(&["u1"]),
            test_config(),
        );

        preloader.preload(uid("u1"), Priority::High);
        settle().await;

        let record = preloader.get_cached(&uid("u1")).expect("hydrated anyway");
        assert!(record.education.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_priority_dispatches_before_earlier_normals() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        preloader.preload(uid("a"), Priority::Normal);
        preloader.preload(uid("b"), Priority::Normal);
        preloader.preload(uid("c"), Priority::High);
        preloader.preload(uid("d"), Priority::High);

        settle().await;

        assert_eq!(
            fetcher.call_subjects(),
            vec![uid("d"), uid("c"), uid("a"), uid("b")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_size_and_cooling_pace() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        for name in ["u1", "u2", "u3", "u4", "u5"] {
            preloader.preload(uid(name), Priority::Normal);
        }

        settle().await;

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 5);
        assert!(fetcher.max_in_flight() <= 2);

        // Group dispatches by their (virtual) start instant: 3 cycles of 2, 2, 1.
        let mut cycles: Vec<(Instant, usize)> = Vec::new();
        for (_, at) in &calls {
            match cycles.last_mut() {
                Some((t, n)) if t == at => *n += 1,
                _ => cycles.push((*at, 1)),
            }
        }
        let counts: Vec<usize> = cycles.iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![2, 2, 1]);

        // Consecutive cycles are separated by at least the cooling interval.
        for pair in cycles.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= Duration::from_secs(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_rearms_after_going_idle() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_millis(100)), test_config());

        preloader.preload(uid("u1"), Priority::Normal);
        settle().await;
        assert!(preloader.get_cached(&uid("u1")).is_some());

        preloader.preload(uid("u2"), Priority::Normal);
        settle().await;
        assert!(preloader.get_cached(&uid("u2")).is_some());

        assert_eq!(fetcher.call_subjects().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_eviction_and_cool_down_readmission() {
        let config = PreloadConfig {
            queue_capacity: 2,
            // Park the scheduler long enough to inspect the queue.
            settle_delay: Duration::from_secs(600),
            ..PreloadConfig::default()
        };
        let (preloader, _fetcher) = build(MockFetcher::new(Duration::from_millis(100)), config);

        preloader.preload(uid("a"), Priority::Normal);
        preloader.preload(uid("b"), Priority::Normal);
        preloader.preload(uid("c"), Priority::Normal);

        {
            let state = preloader.shared.lock_state();
            assert_eq!(state.queue.snapshot(), vec![uid("b"), uid("c")]);
            assert!(matches!(
                state.ledger.status(&uid("a")),
                Some(SubjectStatus::CoolDown { .. })
            ));
        }

        // Still suppressed inside the window.
        preloader.preload(uid("a"), Priority::Normal);
        assert_eq!(preloader.shared.lock_state().queue.len(), 2);

        // After the window lapses the subject is admissible again.
        advance(Duration::from_secs(11)).await;
        preloader.preload(uid("a"), Priority::High);
        {
            let state = preloader.shared.lock_state();
            assert_eq!(state.ledger.status(&uid("a")), Some(SubjectStatus::Queued));
            assert!(state.queue.snapshot().contains(&uid("a")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shed_normal_gets_cool_down_when_queue_all_high() {
        let config = PreloadConfig {
            queue_capacity: 1,
            settle_delay: Duration::from_secs(600),
            ..PreloadConfig::default()
        };
        let (preloader, _fetcher) = build(MockFetcher::new(Duration::from_millis(100)), config);

        preloader.preload(uid("h"), Priority::High);
        preloader.preload(uid("n"), Priority::Normal);

        let state = preloader.shared.lock_state();
        assert_eq!(state.queue.snapshot(), vec![uid("h")]);
        assert!(matches!(
            state.ledger.status(&uid("n")),
            Some(SubjectStatus::CoolDown { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_while_queued_end_to_end() {
        let config = PreloadConfig {
            settle_delay: Duration::from_secs(600),
            ..PreloadConfig::default()
        };
        let (preloader, _fetcher) = build(MockFetcher::new(Duration::from_millis(100)), config);

        preloader.preload(uid("u1"), Priority::High);
        preloader.preload(uid("u2"), Priority::Normal);
        preloader.preload(uid("u1"), Priority::Normal); // duplicate, already queued

        let state = preloader.shared.lock_state();
        assert_eq!(state.queue.snapshot(), vec![uid("u1"), uid("u2")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_cache_and_unsuppresses_failures() {
        let (preloader, fetcher) = build(
            MockFetcher::new(Duration::from_millis(100)).failing_profiles(&["bad"]),
            test_config(),
        );

        preloader.preload(uid("good"), Priority::Normal);
        preloader.preload(uid("bad"), Priority::Normal);
        settle().await;

        assert!(preloader.get_cached(&uid("good")).is_some());
        assert!(preloader.get_cached(&uid("bad")).is_none());

        preloader.reset();

        assert!(preloader.get_cached(&uid("good")).is_none());
        assert_eq!(preloader.cached_count(), 0);

        // Previously-failed subject is admitted again after reset.
        preloader.preload(uid("bad"), Priority::Normal);
        settle().await;

        let bad_calls = fetcher
            .call_subjects()
            .into_iter()
            .filter(|id| *id == uid("bad"))
            .count();
        assert_eq!(bad_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_flight_discards_results() {
        let (preloader, fetcher) =
            build(MockFetcher::new(Duration::from_secs(5)), test_config());

        preloader.preload(uid("u1"), Priority::High);

        // Past the settle delay: the fetch is now in flight.
        sleep(Duration::from_millis(2100)).await;
        assert_eq!(fetcher.call_subjects().len(), 1);

        preloader.reset();
        settle().await;

        // The stale result must not repopulate the cleared cache.
        assert!(preloader.get_cached(&uid("u1")).is_none());
        assert_eq!(preloader.cached_count(), 0);
    }
}

//! Background sweeps.
//!
//! One tokio task per store, each ticking on a fixed period. There is no
//! backoff or jitter: a tick always runs the store's `cleanup()`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::{CacheStore, QueryCache};
use crate::pool::{HandleFactory, ResourcePool};
use crate::service::CacheService;

/// Longest sweep period honoured (about 30 years); longer ones are clamped.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Something a background task can periodically shrink.
pub trait Sweep: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Remove stale entries, returning how many went.
    fn sweep(&self) -> usize;
}

impl<V: Clone + Send + 'static> Sweep for CacheStore<V> {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

impl<F> Sweep for ResourcePool<F>
where
    F: HandleFactory + 'static,
{
    fn name(&self) -> &'static str {
        "pool"
    }

    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

impl Sweep for QueryCache {
    fn name(&self) -> &'static str {
        "query"
    }

    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

/// Sweep periods per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepIntervals {
    pub cache: Duration,
    pub pool: Duration,
    pub query: Duration,
}

impl Default for SweepIntervals {
    fn default() -> Self {
        Self {
            cache: Duration::from_secs(300), // 5 minutes
            pool: Duration::from_secs(300),  // 5 minutes
            query: Duration::from_secs(600), // 10 minutes
        }
    }
}

/// Running sweep tasks. Dropping it stops them.
#[derive(Debug)]
pub struct Scheduler {
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start sweeping every store of `service`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<V, F>(service: &CacheService<V, F>, intervals: SweepIntervals) -> Self
    where
        V: Clone + Send + 'static,
        F: HandleFactory + 'static,
    {
        let mut scheduler = Self { tasks: Vec::new() };
        scheduler.spawn(Arc::clone(service.cache()), intervals.cache);
        scheduler.spawn(Arc::clone(service.pool()), intervals.pool);
        scheduler.spawn(Arc::clone(service.queries()), intervals.query);

        info!(
            "Cleanup scheduler started (cache every {:?}, pool every {:?}, query every {:?})",
            intervals.cache, intervals.pool, intervals.query
        );
        scheduler
    }

    /// Run `target.sweep()` every `period`, first tick one period from now.
    pub fn spawn<S: Sweep>(&mut self, target: Arc<S>, period: Duration) {
        let period = period.clamp(Duration::from_millis(1), MAX_SWEEP_PERIOD);
        let first_tick = Instant::now() + period;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let removed = target.sweep();
                debug!("{} sweep removed {} entries", target.name(), removed);
            }
        });

        self.tasks.push(task);
    }

    /// Number of sweep tasks running.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, SetOptions};
    use crate::service::ServiceConfig;

    fn factory(key: &str) -> Result<String, String> {
        Ok(key.to_string())
    }

    /// Let spawned tasks observe the advanced timer.
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_sweep_runs_on_interval() {
        let clock = Arc::new(ManualClock::starting_now());
        let service: CacheService<u32, _> =
            CacheService::with_clock(&ServiceConfig::default(), factory, clock.clone());
        service
            .cache()
            .set("k", 1, SetOptions::default().ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));

        let intervals = SweepIntervals {
            cache: Duration::from_secs(60),
            ..Default::default()
        };
        let scheduler = Scheduler::start(&service, intervals);
        assert_eq!(scheduler.len(), 3);

        // Nothing reads the key, so only the sweep can remove it
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(service.cache().len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(service.cache().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_sweep_has_its_own_period() {
        let clock = Arc::new(ManualClock::starting_now());
        let service: CacheService<u32, _> =
            CacheService::with_clock(&ServiceConfig::default(), factory, clock.clone());

        let _: Result<u32, String> = service
            .queries()
            .cached_query("q", || async { Ok(1) }, Some(Duration::from_secs(1)))
            .await;
        clock.advance(Duration::from_secs(2));

        let _scheduler = Scheduler::start(&service, SweepIntervals::default());

        tokio::time::advance(Duration::from_secs(301)).await;
        settle().await;
        assert_eq!(service.queries().len(), 1);

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(service.queries().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_period_is_clamped() {
        let clock = Arc::new(ManualClock::starting_now());
        let service: CacheService<u32, _> =
            CacheService::with_clock(&ServiceConfig::default(), factory, clock.clone());
        service
            .cache()
            .set("k", 1, SetOptions::default().ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));

        let intervals = SweepIntervals {
            cache: Duration::from_secs(u64::MAX),
            pool: Duration::MAX,
            query: Duration::from_secs(u64::MAX),
        };
        let scheduler = Scheduler::start(&service, intervals);
        assert_eq!(scheduler.len(), 3);

        tokio::time::advance(Duration::from_secs(86_400)).await;
        settle().await;
        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_scheduler_stops_sweeps() {
        let clock = Arc::new(ManualClock::starting_now());
        let service: CacheService<u32, _> =
            CacheService::with_clock(&ServiceConfig::default(), factory, clock.clone());

        let scheduler = Scheduler::start(&service, SweepIntervals::default());
        drop(scheduler);

        service
            .cache()
            .set("k", 1, SetOptions::default().ttl(Duration::from_secs(1)));
        clock.advance(Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(301)).await;
        settle().await;
        assert_eq!(service.cache().len(), 1);
    }
}

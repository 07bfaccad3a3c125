//! Fixed-interval polling with at most one fetch in flight.
//!
//! Each cycle moves `Idle -> Fetching -> Succeeded -> Idle` or
//! `Idle -> Fetching -> Failed -> FallbackApplied -> Idle`. A tick that fires
//! while a fetch is still outstanding is skipped, never queued. Completed
//! cycles replace the previous [`PollReport`] in a watch channel, so readers
//! always see one whole result.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::fallback::{FetchOutcome, fetch_or_fallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Fetching,
    Succeeded,
    Failed,
    FallbackApplied,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::FallbackApplied => "fallback-applied",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("invalid poll transition from {from} to {to}")]
    InvalidTransition { from: PollPhase, to: PollPhase },
}

/// State of one poller's fetch cycle.
#[derive(Debug, Clone)]
pub struct PollCycle {
    phase: PollPhase,
    completed: u64,
    skipped: u64,
}

impl Default for PollCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PollCycle {
    pub fn new() -> Self {
        Self {
            phase: PollPhase::Idle,
            completed: 0,
            skipped: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Cycles that reached `Idle` again.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Ticks dropped because a fetch was still outstanding.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn transition(&mut self, allowed: &[PollPhase], to: PollPhase) -> Result<(), PollError> {
        if !allowed.contains(&self.phase) {
            return Err(PollError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        debug!(from = %self.phase, to = %to, "poll transition");
        self.phase = to;
        Ok(())
    }

    /// Enter `Fetching`. Returns `false`, and counts a skipped tick, unless idle.
    pub fn begin(&mut self) -> bool {
        if self.phase != PollPhase::Idle {
            self.skipped += 1;
            return false;
        }
        self.phase = PollPhase::Fetching;
        true
    }

    pub fn succeed(&mut self) -> Result<(), PollError> {
        self.transition(&[PollPhase::Fetching], PollPhase::Succeeded)
    }

    pub fn fail(&mut self) -> Result<(), PollError> {
        self.transition(&[PollPhase::Fetching], PollPhase::Failed)
    }

    pub fn apply_fallback(&mut self) -> Result<(), PollError> {
        self.transition(&[PollPhase::Failed], PollPhase::FallbackApplied)
    }

    /// Return to `Idle` after a success or an applied fallback.
    pub fn settle(&mut self) -> Result<(), PollError> {
        self.transition(&[PollPhase::Succeeded, PollPhase::FallbackApplied], PollPhase::Idle)?;
        self.completed += 1;
        Ok(())
    }

    /// Walk the post-fetch transitions for `outcome`, ending in `Idle`.
    fn finish<T>(&mut self, outcome: &FetchOutcome<T>) -> Result<(), PollError> {
        if outcome.is_fallback() {
            self.fail()?;
            self.apply_fallback()?;
        } else {
            self.succeed()?;
        }
        self.settle()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Upper bound on a single fetch.
    pub timeout: Duration,
}

impl PollerConfig {
    pub fn predictions() -> Self {
        Self {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn weather() -> Self {
        Self {
            interval: Duration::from_secs(300),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Result of one completed poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport<T> {
    /// 1-based cycle number.
    pub cycle: u64,
    pub value: T,
    /// Present when `value` is the fallback.
    pub fallback_reason: Option<String>,
    /// Ticks skipped so far because a fetch was outstanding.
    pub skipped_ticks: u64,
    pub completed_at: DateTime<Utc>,
}

/// Handle to a running poller.
pub struct PollerHandle<T> {
    shutdown: watch::Sender<bool>,
    reports: watch::Receiver<Option<PollReport<T>>>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollerHandle<T> {
    /// A receiver that wakes on every completed cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<PollReport<T>>> {
        self.reports.clone()
    }

    pub fn latest(&self) -> Option<PollReport<T>> {
        self.reports.borrow().clone()
    }

    /// Stop polling. An in-flight fetch is dropped and its result discarded.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "poller task ended abnormally");
        }
    }
}

pub struct Poller;

impl Poller {
    /// Spawn a poller that calls `fetch` every `config.interval`.
    ///
    /// The first fetch starts immediately. Failures and timeouts publish
    /// `fallback` for that cycle; the loop itself never stops on a bad cycle.
    pub fn spawn<T, E, F, Fut>(
        name: impl Into<String>,
        fetch: F,
        fallback: T,
        config: PollerConfig,
    ) -> PollerHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let name = name.into();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);

        let task = tokio::spawn(run(name, fetch, fallback, config, shutdown_rx, report_tx));

        PollerHandle {
            shutdown: shutdown_tx,
            reports: report_rx,
            task,
        }
    }
}

async fn next_outcome<T>(slot: &mut Option<BoxFuture<'static, FetchOutcome<T>>>) -> FetchOutcome<T> {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn run<T, E, F, Fut>(
    name: String,
    fetch: F,
    fallback: T,
    config: PollerConfig,
    mut shutdown: watch::Receiver<bool>,
    reports: watch::Sender<Option<PollReport<T>>>,
) where
    T: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cycle = PollCycle::new();
    let mut in_flight: Option<BoxFuture<'static, FetchOutcome<T>>> = None;

    info!(poller = %name, interval_secs = config.interval.as_secs(), "poller started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if !cycle.begin() {
                    warn!(poller = %name, skipped = cycle.skipped(), "previous fetch still running, skipping tick");
                    continue;
                }
                in_flight = Some(fetch_or_fallback(fetch(), fallback.clone(), config.timeout).boxed());
            }
            outcome = next_outcome(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                // Torn down while the fetch was running: drop the result.
                if *shutdown.borrow() {
                    break;
                }
                if let Err(e) = cycle.finish(&outcome) {
                    warn!(poller = %name, error = %e, "poll cycle out of step, resetting");
                    cycle = PollCycle { skipped: cycle.skipped, completed: cycle.completed, ..PollCycle::new() };
                }
                let fallback_reason = outcome.reason().map(|r| r.to_string());
                let report = PollReport {
                    cycle: cycle.completed(),
                    value: outcome.into_value(),
                    fallback_reason,
                    skipped_ticks: cycle.skipped(),
                    completed_at: Utc::now(),
                };
                info!(
                    poller = %name,
                    cycle = report.cycle,
                    fallback = report.fallback_reason.is_some(),
                    "poll cycle complete"
                );
                reports.send_replace(Some(report));
            }
        }
    }

    info!(poller = %name, completed = cycle.completed(), "poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(interval_secs: u64, timeout_secs: u64) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn next_report<T: Clone>(rx: &mut watch::Receiver<Option<PollReport<T>>>) -> PollReport<T> {
        rx.changed().await.expect("poller dropped");
        rx.borrow_and_update().clone().expect("report published")
    }

    #[test]
    fn cycle_success_path() {
        let mut cycle = PollCycle::new();
        assert!(cycle.begin());
        assert_eq!(cycle.phase(), PollPhase::Fetching);
        cycle.succeed().unwrap();
        assert_eq!(cycle.phase(), PollPhase::Succeeded);
        cycle.settle().unwrap();
        assert_eq!(cycle.phase(), PollPhase::Idle);
        assert_eq!(cycle.completed(), 1);
    }

    #[test]
    fn cycle_fallback_path() {
        let mut cycle = PollCycle::new();
        assert!(cycle.begin());
        cycle.fail().unwrap();
        cycle.apply_fallback().unwrap();
        assert_eq!(cycle.phase(), PollPhase::FallbackApplied);
        cycle.settle().unwrap();
        assert_eq!(cycle.phase(), PollPhase::Idle);
    }

    #[test]
    fn fetching_only_entered_from_idle() {
        let mut cycle = PollCycle::new();
        assert!(cycle.begin());
        assert!(!cycle.begin());
        assert!(!cycle.begin());
        assert_eq!(cycle.skipped(), 2);
        assert_eq!(cycle.phase(), PollPhase::Fetching);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut cycle = PollCycle::new();
        assert_eq!(
            cycle.succeed(),
            Err(PollError::InvalidTransition {
                from: PollPhase::Idle,
                to: PollPhase::Succeeded
            })
        );
        assert!(cycle.settle().is_err());
        assert!(cycle.apply_fallback().is_err());

        cycle.begin();
        cycle.succeed().unwrap();
        // A success cannot turn into a fallback.
        assert!(cycle.apply_fallback().is_err());
        assert!(cycle.fail().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_fresh_values() {
        let handle = Poller::spawn("test", || async { Ok::<u32, String>(42) }, 0, config(60, 10));
        let mut rx = handle.subscribe();

        let first = next_report(&mut rx).await;
        assert_eq!(first.cycle, 1);
        assert_eq!(first.value, 42);
        assert!(first.fallback_reason.is_none());

        let second = next_report(&mut rx).await;
        assert_eq!(second.cycle, 2);
        assert_eq!(handle.latest().map(|r| r.cycle), Some(2));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failures_publish_fallback_and_keep_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = Poller::spawn(
            "test",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("endpoint unreachable") }
            },
            7,
            config(60, 10),
        );
        let mut rx = handle.subscribe();

        for expected in 1..=3 {
            let report = next_report(&mut rx).await;
            assert_eq!(report.cycle, expected);
            assert_eq!(report.value, 7);
            assert_eq!(report.fallback_reason.as_deref(), Some("failed: endpoint unreachable"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_times_out_to_fallback() {
        let handle = Poller::spawn(
            "test",
            || std::future::pending::<Result<u32, String>>(),
            7,
            config(60, 10),
        );
        let mut rx = handle.subscribe();
        let start = tokio::time::Instant::now();

        let report = next_report(&mut rx).await;
        assert_eq!(report.value, 7);
        assert_eq!(report.fallback_reason.as_deref(), Some("timed out after 10000ms"));
        assert!(start.elapsed() < Duration::from_secs(60));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_during_a_slow_fetch_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // Fetch takes 130s against a 60s interval; the 60s and 120s ticks
        // must not start a second fetch.
        let handle = Poller::spawn(
            "test",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(130)).await;
                    Ok::<u32, String>(1)
                }
            },
            0,
            config(60, 150),
        );
        let mut rx = handle.subscribe();

        let report = next_report(&mut rx).await;
        assert_eq!(report.value, 1);
        assert_eq!(report.skipped_ticks, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_in_flight_result() {
        let handle = Poller::spawn(
            "test",
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<u32, String>(99)
            },
            0,
            config(60, 45),
        );
        let rx = handle.subscribe();

        // Let the first fetch start, then tear down before it resolves.
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.shutdown().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn presets_match_refresh_intervals() {
        assert_eq!(PollerConfig::predictions().interval, Duration::from_secs(60));
        assert_eq!(PollerConfig::weather().interval, Duration::from_secs(300));
    }
}

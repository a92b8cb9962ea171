//! Fixed-interval cycle driver.
//!
//! Intervals are measured from cycle start. A cycle that overruns the interval
//! is followed immediately by the next one; a short cycle is followed by a
//! countdown until the interval has elapsed. Failed cycles are logged and the
//! loop carries on. Only cancellation or a fatal error ends it.

mod countdown;

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::WatchError;
use crate::run_error;
use crate::run_log::RunLog;

use countdown::Countdown;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// One unit of scheduled work.
#[allow(async_fn_in_trait)]
pub trait PollCycle {
    async fn run_cycle(&mut self) -> Result<(), WatchError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub failed: u64,
    pub countdown_ticks: u64,
}

pub struct PollScheduler {
    interval: Duration,
    log: RunLog,
    show_countdown: bool,
}

/// Time left to wait after a cycle that took `elapsed`. Never negative.
pub fn remaining_wait(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

impl PollScheduler {
    pub fn new(interval: Duration, log: RunLog) -> Self {
        Self {
            interval,
            log,
            show_countdown: true,
        }
    }

    pub fn with_countdown(mut self, show: bool) -> Self {
        self.show_countdown = show;
        self
    }

    /// Runs cycles until `cancel` fires or a cycle fails fatally. An in-flight
    /// cycle always completes.
    pub async fn run<C: PollCycle>(&self, cycle: &mut C, cancel: CancellationToken) -> SchedulerStats {
        let mut stats = SchedulerStats::default();

        while !cancel.is_cancelled() {
            let started = Instant::now();
            stats.cycles += 1;

            if let Err(err) = cycle.run_cycle().await {
                stats.failed += 1;
                run_error!(self.log, "An error occurred: {err}");
                if err.is_fatal() {
                    run_error!(self.log, "Unrecoverable error; no further cycles will run");
                    break;
                }
            }

            if !self.wait_for_next_cycle(started, &cancel, &mut stats).await {
                break;
            }
        }

        stats
    }

    /// Returns false when cancelled while waiting.
    async fn wait_for_next_cycle(
        &self,
        started: Instant,
        cancel: &CancellationToken,
        stats: &mut SchedulerStats,
    ) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        let mut remaining = remaining_wait(self.interval, started.elapsed());
        if remaining.is_zero() {
            return true;
        }

        let countdown = Countdown::new(self.show_countdown);
        while !remaining.is_zero() {
            countdown.show(remaining);
            stats.countdown_ticks += 1;

            tokio::select! {
                _ = sleep(remaining.min(COUNTDOWN_STEP)) => {}
                _ = cancel.cancelled() => {
                    countdown.finish();
                    return false;
                }
            }
            remaining = remaining_wait(self.interval, started.elapsed());
        }
        countdown.finish();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct ScriptedCycle {
        starts: Vec<Instant>,
        work: Duration,
        fail_on: Vec<u64>,
        fatal_on: Option<u64>,
        stop_after: u64,
        cancel: CancellationToken,
    }

    impl ScriptedCycle {
        fn new(work: Duration, stop_after: u64, cancel: CancellationToken) -> Self {
            Self {
                starts: Vec::new(),
                work,
                fail_on: Vec::new(),
                fatal_on: None,
                stop_after,
                cancel,
            }
        }
    }

    impl PollCycle for ScriptedCycle {
        async fn run_cycle(&mut self) -> Result<(), WatchError> {
            self.starts.push(Instant::now());
            let n = self.starts.len() as u64;
            sleep(self.work).await;
            if n >= self.stop_after {
                self.cancel.cancel();
            }
            if self.fatal_on == Some(n) {
                return Err(WatchError::Auth(anyhow!("session expired")));
            }
            if self.fail_on.contains(&n) {
                return Err(WatchError::Fetch(anyhow!("cycle {n} fetch failed")));
            }
            Ok(())
        }
    }

    fn scheduler(interval: Duration) -> (tempfile::TempDir, PollScheduler) {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::open(dir.path().join("logfile.log")).unwrap();
        (dir, PollScheduler::new(interval, log).with_countdown(false))
    }

    fn gaps(starts: &[Instant]) -> Vec<Duration> {
        starts.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn remaining_wait_saturates() {
        let interval = Duration::from_secs(10);
        assert_eq!(remaining_wait(interval, Duration::from_secs(3)), Duration::from_secs(7));
        assert_eq!(remaining_wait(interval, Duration::from_secs(10)), Duration::ZERO);
        assert_eq!(remaining_wait(interval, Duration::from_secs(25)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn short_cycles_start_one_interval_apart() {
        let (_dir, scheduler) = scheduler(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let mut cycle = ScriptedCycle::new(Duration::from_secs(2), 3, cancel.clone());

        let stats = scheduler.run(&mut cycle, cancel).await;

        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(gaps(&cycle.starts), vec![Duration::from_secs(10); 2]);
        // 8 one-second countdown steps after each of the first two cycles.
        assert_eq!(stats.countdown_ticks, 16);
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_is_followed_immediately() {
        let (_dir, scheduler) = scheduler(Duration::from_secs(3));
        let cancel = CancellationToken::new();
        let mut cycle = ScriptedCycle::new(Duration::from_secs(5), 3, cancel.clone());

        let stats = scheduler.run(&mut cycle, cancel).await;

        assert_eq!(stats.cycles, 3);
        assert_eq!(gaps(&cycle.starts), vec![Duration::from_secs(5); 2]);
        assert_eq!(stats.countdown_ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_logged_and_do_not_stop_the_loop() {
        let (dir, scheduler) = scheduler(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let mut cycle = ScriptedCycle::new(Duration::ZERO, 5, cancel.clone());
        cycle.fail_on = vec![3];

        let stats = scheduler.run(&mut cycle, cancel).await;

        assert_eq!(stats.cycles, 5);
        assert_eq!(stats.failed, 1);
        let log = std::fs::read_to_string(dir.path().join("logfile.log")).unwrap();
        assert!(log.contains("ERROR - An error occurred: fetch failed: cycle 3 fetch failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_stops_the_loop() {
        let (dir, scheduler) = scheduler(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let mut cycle = ScriptedCycle::new(Duration::ZERO, 10, cancel.clone());
        cycle.fatal_on = Some(2);

        let stats = scheduler.run(&mut cycle, cancel.clone()).await;

        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.failed, 1);
        assert!(!cancel.is_cancelled());
        let log = std::fs::read_to_string(dir.path().join("logfile.log")).unwrap();
        assert!(log.contains("ERROR - An error occurred: authentication failed: session expired"));
        assert!(log.contains("no further cycles will run"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let (_dir, scheduler) = scheduler(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let mut cycle = ScriptedCycle::new(Duration::ZERO, u64::MAX, cancel.clone());

        let stopper = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            stopper.cancel();
        });

        let started = Instant::now();
        let stats = scheduler.run(&mut cycle, cancel).await;

        assert_eq!(stats.cycles, 1);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let (_dir, scheduler) = scheduler(Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut cycle = ScriptedCycle::new(Duration::ZERO, 1, cancel.clone());

        let stats = scheduler.run(&mut cycle, cancel).await;
        assert_eq!(stats.cycles, 0);
        assert!(cycle.starts.is_empty());
    }
}

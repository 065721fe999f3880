//! Progress estimation and the background ticker
//!
//! The ticker thread never touches search state. It only raises flags that
//! the driver polls between candidates, so snapshots are taken at
//! candidate boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Early progress reports before the regular cadence starts.
const EARLY_REPORTS: [Duration; 2] = [Duration::from_secs(10), Duration::from_secs(30)];

/// Sleep granularity of the ticker thread.
const POLL: Duration = Duration::from_millis(50);

/// Snapshot of how far a run has come.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEstimate {
    /// Percentage of the total checked, 0–100.
    pub percent: f64,
    /// Time spent in this run.
    pub elapsed: Duration,
    /// Estimated time left, once anything has been checked in this run.
    pub remaining: Option<Duration>,
}

/// Estimate progress; `start_count` is the count this run resumed from so
/// the rate only reflects work done since then.
pub fn estimate(count: u64, total: u64, start_count: u64, elapsed: Duration) -> ProgressEstimate {
    if total == 0 {
        return ProgressEstimate {
            percent: 100.0,
            elapsed,
            remaining: Some(Duration::ZERO),
        };
    }
    let fraction = count as f64 / total as f64;
    let start_fraction = start_count as f64 / total as f64;
    let done_here = fraction - start_fraction;
    let remaining = (done_here > 0.0).then(|| {
        let total_secs = elapsed.as_secs_f64() / done_here * (1.0 - start_fraction);
        Duration::from_secs_f64((total_secs - elapsed.as_secs_f64()).max(0.0))
    });
    ProgressEstimate {
        percent: fraction * 100.0,
        elapsed,
        remaining,
    }
}

/// Background thread raising "checkpoint due" and "progress due" flags.
#[derive(Debug)]
pub struct Ticker {
    checkpoint_due: Arc<AtomicBool>,
    progress_due: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start ticking: a checkpoint every `interval`, progress at 10 s,
    /// 30 s, then every `interval`.
    pub fn spawn(interval: Duration) -> Self {
        let checkpoint_due = Arc::new(AtomicBool::new(false));
        let progress_due = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let interval = interval.max(POLL);

        let handle = {
            let checkpoint_due = Arc::clone(&checkpoint_due);
            let progress_due = Arc::clone(&progress_due);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                let start = Instant::now();
                let mut next_checkpoint = interval;
                let mut early = EARLY_REPORTS.iter().copied().filter(|t| *t < interval);
                let mut next_progress = early.next().unwrap_or(interval);
                while !shutdown.load(Ordering::Relaxed) {
                    thread::sleep(POLL);
                    let now = start.elapsed();
                    if now >= next_checkpoint {
                        checkpoint_due.store(true, Ordering::Relaxed);
                        next_checkpoint += interval;
                    }
                    if now >= next_progress {
                        progress_due.store(true, Ordering::Relaxed);
                        next_progress = match early.next() {
                            Some(t) => t,
                            None if next_progress < interval => interval,
                            None => next_progress + interval,
                        };
                    }
                }
            })
        };

        Self {
            checkpoint_due,
            progress_due,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Consume the checkpoint flag.
    pub fn take_checkpoint_due(&self) -> bool {
        self.checkpoint_due.swap(false, Ordering::Relaxed)
    }

    /// Consume the progress flag.
    pub fn take_progress_due(&self) -> bool {
        self.progress_due.swap(false, Ordering::Relaxed)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_fresh_run() {
        let est = estimate(25, 100, 0, Duration::from_secs(10));
        assert!((est.percent - 25.0).abs() < 1e-9);
        let remaining = est.remaining.unwrap().as_secs_f64();
        assert!((remaining - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_resumed_run_uses_local_rate() {
        // resumed at 50%, 10% more done in 10 s: 40% left at 1%/s
        let est = estimate(60, 100, 50, Duration::from_secs(10));
        let remaining = est.remaining.unwrap().as_secs_f64();
        assert!((remaining - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_without_progress() {
        let est = estimate(50, 100, 50, Duration::from_secs(3));
        assert!(est.remaining.is_none());
        assert_eq!(estimate(0, 0, 0, Duration::ZERO).percent, 100.0);
    }

    #[test]
    fn test_ticker_raises_checkpoint_flag() {
        let ticker = Ticker::spawn(Duration::from_millis(60));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !ticker.take_checkpoint_due() {
            assert!(Instant::now() < deadline, "ticker never fired");
            thread::sleep(Duration::from_millis(10));
        }
    }
}

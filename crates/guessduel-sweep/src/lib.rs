//! Fixed-interval sweep scheduler for guessduel.
//!
//! Abandoned rooms are removed passively: nothing reacts to a player
//! leaving, a background task just wakes up every so often and deletes
//! whatever has outlived its TTL. This crate owns the "every so often".
//!
//! # Disabled mode
//!
//! When `interval` is zero the scheduler is disabled and
//! [`SweepScheduler::wait_for_sweep`] pends forever. Lookups still refuse
//! expired rooms, so correctness does not depend on the sweep; only memory
//! does.
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = SweepScheduler::new(config);
//! loop {
//!     let info = scheduler.wait_for_sweep().await;
//!     let removed = coordinator.lock().await.sweep_expired();
//!     scheduler.record_sweep(&info, removed.len());
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the sweep scheduler.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps. Zero disables sweeping.
    pub interval: Duration,
    /// Random delay (0..max) added to the *first* sweep so several servers
    /// started together do not sweep in lockstep.
    pub initial_jitter: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_jitter: Duration::from_secs(2),
        }
    }
}

impl SweepConfig {
    /// Shortest non-zero interval accepted.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    /// A config sweeping every `interval`, without jitter.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            initial_jitter: Duration::ZERO,
        }
    }

    /// A config that never sweeps.
    pub fn disabled() -> Self {
        Self::with_interval(Duration::ZERO)
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`SweepScheduler::new`]. A non-zero interval
    /// below [`Self::MIN_INTERVAL`] is raised to it; jitter is capped at one
    /// interval.
    pub fn validated(mut self) -> Self {
        if !self.interval.is_zero() && self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "sweep interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if !self.interval.is_zero() && self.initial_jitter > self.interval {
            self.initial_jitter = self.interval;
        }
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.interval.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Sweep info (returned to caller each sweep)
// ---------------------------------------------------------------------------

/// Returned by [`SweepScheduler::wait_for_sweep`] when a sweep is due.
#[derive(Debug, Clone)]
pub struct SweepInfo {
    /// Monotonically increasing sweep number (starts at 1).
    pub sweep: u64,
    /// How late the scheduler woke up relative to its deadline.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Running totals, updated by [`SweepScheduler::record_sweep`] and
/// reported in its log lines.
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    /// Sweeps completed.
    pub total_sweeps: u64,
    /// Rooms removed across all sweeps.
    pub total_removed: u64,
    /// Worst wake-up delay seen so far.
    pub max_late_by: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval sweep scheduler.
///
/// One per server. A sweep that wakes up late does not trigger extra
/// catch-up sweeps: the next deadline is always one interval after the
/// sweep actually fired.
pub struct SweepScheduler {
    config: SweepConfig,
    sweep_count: u64,
    /// When the next sweep should fire; `None` when disabled.
    next_sweep: Option<Instant>,
    metrics: SweepMetrics,
}

impl SweepScheduler {
    /// Creates a scheduler whose first sweep is one interval (plus jitter)
    /// from now.
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();

        let next_sweep = (!config.is_disabled()).then(|| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max_ms = config.initial_jitter.as_millis().max(1) as u64;
                Duration::from_millis(rand::rng().random_range(0..max_ms))
            };
            Instant::now() + config.interval + jitter
        });

        if config.is_disabled() {
            debug!("sweep scheduler created disabled");
        } else {
            debug!(
                interval_s = config.interval.as_secs_f64(),
                "sweep scheduler created"
            );
        }

        Self {
            config,
            sweep_count: 0,
            next_sweep,
            metrics: SweepMetrics::default(),
        }
    }

    /// Creates a jitter-free scheduler sweeping every `interval`.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(SweepConfig::with_interval(interval))
    }

    /// Waits until the next sweep is due.
    ///
    /// Pends forever when disabled; safe to use as a `tokio::select!`
    /// branch.
    pub async fn wait_for_sweep(&mut self) -> SweepInfo {
        let Some(next) = self.next_sweep else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.sweep_count += 1;
        self.next_sweep = Some(now + self.config.interval);

        let late_by = now.saturating_duration_since(next);
        trace!(sweep = self.sweep_count, ?late_by, "sweep due");

        SweepInfo {
            sweep: self.sweep_count,
            late_by,
        }
    }

    /// Records that the sweep described by `info` removed `removed` rooms.
    ///
    /// A sweep that woke up more than one interval late is logged as a
    /// warning: the runtime is starved or the sweep lock was contended.
    pub fn record_sweep(&mut self, info: &SweepInfo, removed: usize) {
        self.metrics.total_sweeps += 1;
        self.metrics.total_removed += removed as u64;
        self.metrics.max_late_by = self.metrics.max_late_by.max(info.late_by);

        if info.late_by > self.config.interval {
            warn!(
                sweep = info.sweep,
                late_by_ms = info.late_by.as_millis() as u64,
                max_late_by_ms = self.metrics.max_late_by.as_millis() as u64,
                total_sweeps = self.metrics.total_sweeps,
                "expiry sweep ran late"
            );
        }

        if removed > 0 {
            info!(
                sweep = info.sweep,
                removed,
                total_removed = self.metrics.total_removed,
                "expired rooms swept"
            );
        } else {
            trace!(sweep = info.sweep, "sweep found nothing to remove");
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.config.is_disabled()
    }

    pub fn sweep_count(&self) -> u64 {
        self.sweep_count
    }

    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

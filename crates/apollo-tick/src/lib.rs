//! Fixed-period tick for Apollo games.
//!
//! Every game advances its board on a steady beat (250 ms by default).
//! [`GameTick`] owns that beat: it sleeps until the next deadline, reports
//! how late it woke, and watches how long the game spent on the step.
//!
//! It sits inside the game actor's `tokio::select!` loop next to the inbox,
//! so commands are handled between ticks, never during one:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = inbox.recv() => { /* join, leave, action */ }
//!         info = tick.wait() => {
//!             if info.skipped > 0 { /* fell behind */ }
//!             game.on_tick(SystemTime::now());
//!             tick.record_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`GameTick`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between two ticks.
    pub period: Duration,
    /// Fraction of the period (0.0–1.0) a step may use before a warning
    /// is logged.
    pub budget_warn_threshold: f64,
    /// Upper bound of the random delay added to the first tick, so games
    /// created together don't step in lockstep.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(250),
            budget_warn_threshold: 0.8,
            initial_jitter: Duration::from_millis(2),
        }
    }
}

impl TickConfig {
    /// Shortest period accepted; anything lower is raised to it.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Default settings with the given period.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(period = ?self.period, "tick period too short, raising to minimum");
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// What [`GameTick::wait`] reports for each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// `true` when the wake-up came more than a tenth of a period late.
    pub late: bool,
    /// Whole periods missed before this tick fired. Missed beats are not
    /// replayed; the next deadline is one period after this wake-up.
    pub skipped: u64,
}

/// Counters kept across the life of a [`GameTick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMetrics {
    /// Ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired late.
    pub total_late: u64,
    /// Periods skipped because a wake-up came late.
    pub total_skipped: u64,
    /// Longest step reported through [`GameTick::record_end`].
    pub max_step_time: Duration,
}

// ---------------------------------------------------------------------------
// GameTick
// ---------------------------------------------------------------------------

/// The beat of one game. One per game actor.
pub struct GameTick {
    config: TickConfig,
    count: u64,
    next: TokioInstant,
    step_start: Option<Instant>,
    metrics: TickMetrics,
}

impl GameTick {
    /// Creates a tick whose first deadline is one period (plus jitter)
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let jitter = match config.initial_jitter.as_micros() as u64 {
            0 => Duration::ZERO,
            max => Duration::from_micros(rand::rng().random_range(0..max)),
        };
        let next = TokioInstant::now() + config.period + jitter;
        Self {
            config,
            count: 0,
            next,
            step_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// deadline untouched, so losing a `select!` race costs nothing.
    pub async fn wait(&mut self) -> TickInfo {
        time::sleep_until(self.next).await;

        let now = TokioInstant::now();
        let period = self.config.period;
        let late_by = now.saturating_duration_since(self.next);
        let late = late_by > period / 10;
        let skipped = if late {
            u64::try_from(late_by.as_nanos() / period.as_nanos()).unwrap_or(u64::MAX)
        } else {
            0
        };
        self.next = now + period;

        self.count += 1;
        self.step_start = Some(Instant::now());
        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += skipped;
        if late {
            self.metrics.total_late += 1;
        }
        trace!(tick = self.count, late, "game tick");

        TickInfo {
            tick: self.count,
            late,
            skipped,
        }
    }

    /// Marks the end of the step started by the last [`wait`](Self::wait).
    ///
    /// Logs a warning when the step used more of the period than
    /// `budget_warn_threshold` allows.
    pub fn record_end(&mut self) {
        let Some(start) = self.step_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        if elapsed > self.metrics.max_step_time {
            self.metrics.max_step_time = elapsed;
        }

        let used = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        if used >= self.config.budget_warn_threshold {
            warn!(
                tick = self.count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                period_ms = self.config.period.as_secs_f64() * 1000.0,
                "game step is close to its tick period"
            );
        }
    }

    /// Counters collected so far.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}

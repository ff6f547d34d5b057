//! Integration tests for the game tick.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the clock
//! is advanced, which keeps the timing assertions exact.

use std::time::Duration;

use apollo_tick::{GameTick, TickConfig};

// =========================================================================
// Helpers
// =========================================================================

fn no_jitter(period_ms: u64) -> TickConfig {
    TickConfig {
        initial_jitter: Duration::ZERO,
        ..TickConfig::with_period(Duration::from_millis(period_ms))
    }
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_period_is_quarter_second() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.period, Duration::from_millis(250));
    assert_eq!(cfg.initial_jitter, Duration::from_millis(2));
}

#[tokio::test(start_paused = true)]
async fn test_zero_period_is_raised() {
    let start = tokio::time::Instant::now();
    let mut tick = GameTick::new(no_jitter(0));
    tick.wait().await;
    assert_eq!(start.elapsed(), TickConfig::MIN_PERIOD);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_after_one_period() {
    let start = tokio::time::Instant::now();
    let mut tick = GameTick::new(no_jitter(250));

    let info = tick.wait().await;
    assert_eq!(info.tick, 1);
    assert!(!info.late);
    assert_eq!(info.skipped, 0);
    assert_eq!(start.elapsed(), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_numbered_in_order() {
    let mut tick = GameTick::new(no_jitter(50));
    for expected in 1..=5 {
        assert_eq!(tick.wait().await.tick, expected);
    }
    assert_eq!(tick.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_first_tick_within_bound() {
    let start = tokio::time::Instant::now();
    let mut tick = GameTick::new(TickConfig {
        initial_jitter: Duration::from_millis(5),
        ..TickConfig::with_period(Duration::from_millis(100))
    });

    tick.wait().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(105));
}

// =========================================================================
// Late wake-ups
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_late_wake_counts_missed_periods() {
    let mut tick = GameTick::new(no_jitter(100));

    // Deadline is t=100ms; wake at t=450ms.
    tokio::time::advance(Duration::from_millis(450)).await;
    let info = tick.wait().await;
    assert!(info.late);
    assert_eq!(info.skipped, 3);
    assert_eq!(tick.metrics().total_late, 1);
    assert_eq!(tick.metrics().total_skipped, 3);

    // Rescheduled from now: the next tick is a full period away.
    let before = tokio::time::Instant::now();
    let info = tick.wait().await;
    assert!(!info.late);
    assert_eq!(before.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_slightly_late_wake_is_not_late() {
    let mut tick = GameTick::new(no_jitter(100));

    // Within a tenth of the period.
    tokio::time::advance(Duration::from_millis(105)).await;
    let info = tick.wait().await;
    assert!(!info.late);
    assert_eq!(info.skipped, 0);
    assert_eq!(tick.metrics().total_late, 0);
}

// =========================================================================
// Step timing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_end_without_wait_is_noop() {
    let mut tick = GameTick::new(no_jitter(50));
    tick.record_end();
    assert_eq!(tick.metrics().max_step_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_max_step_time_tracked() {
    let mut tick = GameTick::new(no_jitter(50));

    // record_end measures wall-clock time, so burn a little of it.
    tick.wait().await;
    std::thread::sleep(Duration::from_micros(50));
    tick.record_end();

    assert!(tick.metrics().max_step_time > Duration::ZERO);
}

// =========================================================================
// select! loop, as used by the game actor
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_inbox_is_served_between_ticks() {
    let mut tick = GameTick::new(no_jitter(250));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        tx.send("stop").await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = tick.wait() => {
                fired += 1;
                tick.record_end();
                assert_eq!(info.tick, fired);
            }
        }
    }

    assert_eq!(fired, 3, "ticks at 250, 500 and 750 ms precede the stop");
}

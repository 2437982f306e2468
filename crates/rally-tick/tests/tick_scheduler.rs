//! Integration tests for the tick scheduler.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the runtime
//! has nothing else to do.

use std::time::Duration;

use rally_tick::{TickConfig, TickPolicy, TickScheduler};

fn config_20hz() -> TickConfig {
    TickConfig::with_rate(20)
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_60hz_skip() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 60);
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_with_rate_sets_duration() {
    assert_eq!(
        TickConfig::with_rate(20).tick_duration(),
        Duration::from_millis(50)
    );
}

#[test]
fn test_zero_rate_is_clamped_to_one() {
    let cfg = TickConfig::with_rate(0).validated();
    assert_eq!(cfg.tick_rate_hz, 1);
}

#[test]
fn test_excessive_rate_is_clamped() {
    let s = TickScheduler::with_rate(1000);
    assert_eq!(s.tick_rate_hz(), TickConfig::MAX_TICK_RATE_HZ);
}

#[tokio::test(start_paused = true)]
async fn test_initial_jitter_stays_within_bound() {
    let mut s = TickScheduler::new(TickConfig {
        initial_jitter_us: 10_000,
        ..config_20hz()
    });

    let start = tokio::time::Instant::now();
    s.wait_for_tick().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed <= Duration::from_millis(60));
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(config_20hz());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(50));
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_by_exactly_one() {
    let mut s = TickScheduler::new(config_20hz());

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
    }
    assert_eq!(s.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_spaced_one_period_apart() {
    let mut s = TickScheduler::new(config_20hz());

    let start = tokio::time::Instant::now();
    for _ in 0..4 {
        s.wait_for_tick().await;
    }
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

// =========================================================================
// Pause / Resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_prevents_ticks() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;

    s.pause();
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(1), s.wait_for_tick()).await;
    assert!(result.is_err(), "paused scheduler should pend");
}

#[tokio::test(start_paused = true)]
async fn test_new_paused_waits_for_resume() {
    let mut s = TickScheduler::new_paused(config_20hz());
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(1), s.wait_for_tick()).await;
    assert!(result.is_err());

    s.resume();
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_reschedules_from_now() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;
    s.pause();

    tokio::time::advance(Duration::from_secs(30)).await;

    s.resume();
    let resumed_at = tokio::time::Instant::now();
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 2);
    assert!(!info.overrun);
    assert_eq!(resumed_at.elapsed(), Duration::from_millis(50));
}

#[tokio::test]
async fn test_pause_resume_idempotent() {
    let mut s = TickScheduler::new(config_20hz());
    s.pause();
    s.pause();
    assert!(s.is_paused());
    s.resume();
    s.resume();
    assert!(!s.is_paused());
}

// =========================================================================
// Overruns
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_counts_skipped_ticks() {
    let mut s = TickScheduler::new(config_20hz());

    // Next tick was due at 50ms; wake at 175ms → 2 whole periods late.
    tokio::time::advance(Duration::from_millis(175)).await;
    let info = s.wait_for_tick().await;

    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(s.metrics().total_overruns, 1);
    assert_eq!(s.metrics().total_skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence() {
    let mut s = TickScheduler::new(TickConfig {
        policy: TickPolicy::Drop,
        ..config_20hz()
    });

    tokio::time::advance(Duration::from_millis(80)).await;
    let late = s.wait_for_tick().await;
    assert!(late.overrun);
    assert_eq!(late.ticks_skipped, 0);

    // Original schedule had the second tick at 100ms, 20ms from now.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_millis(20));
}

// =========================================================================
// Budget tracking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut s = TickScheduler::new(config_20hz());
    s.record_tick_end();
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_step_time() {
    let mut s = TickScheduler::new(config_20hz());

    s.wait_for_tick().await;
    // Budget uses the wall clock, so burn a little real time.
    std::thread::sleep(Duration::from_micros(50));
    s.record_tick_end();

    let m = s.metrics();
    assert!(m.max_tick_time > Duration::ZERO);
    assert!(m.budget_utilization > 0.0);
    assert!(m.budget_utilization < 1.0);
}

// =========================================================================
// select! loop pattern (mirrors the match actor)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut s = TickScheduler::new(config_20hz());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(10);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        tx.send("stop").await.ok();
    });

    let mut ticks_fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = s.wait_for_tick() => {
                ticks_fired += 1;
                s.record_tick_end();
                assert_eq!(info.tick, ticks_fired);
            }
        }
    }

    assert_eq!(ticks_fired, 3);
}

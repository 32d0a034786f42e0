//! Tests for [`CircuitBreaker`] — the three-state failure-protection
//! automaton. The `Open → HalfOpen` cooldown transition is lazy (on
//! read), so a paused tokio clock drives every case deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use garmr::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use garmr::{GarmrError, Result};

fn breaker(threshold: usize, reset_timeout: Duration) -> CircuitBreaker {
    CircuitBreaker::new(
        CircuitBreakerConfig::new()
            .failure_threshold(threshold)
            .window(Duration::from_secs(60))
            .reset_timeout(reset_timeout),
    )
}

#[tokio::test(start_paused = true)]
async fn starts_closed_and_allowed() {
    let breaker = breaker(3, Duration::from_secs(10));
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.is_allowed());
}

#[tokio::test(start_paused = true)]
async fn threshold_failures_open_the_circuit() {
    let breaker = breaker(3, Duration::from_secs(10));
    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.is_allowed());
}

#[tokio::test(start_paused = true)]
async fn cooldown_elapses_into_half_open() {
    let breaker = breaker(3, Duration::from_millis(10_000));
    for _ in 0..3 {
        breaker.record_failure();
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_millis(10_001)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.is_allowed(), "half-open admits probe requests");
}

#[tokio::test(start_paused = true)]
async fn half_open_success_closes_with_fresh_counters() {
    let breaker = breaker(3, Duration::from_millis(10_000));
    for _ in 0..3 {
        breaker.record_failure();
    }
    tokio::time::advance(Duration::from_millis(10_001)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0, "close clears recorded outcomes");
}

#[tokio::test(start_paused = true)]
async fn half_open_failure_reopens() {
    let breaker = breaker(3, Duration::from_secs(10));
    for _ in 0..3 {
        breaker.record_failure();
    }
    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn failures_age_out_of_the_window() {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::new()
            .failure_threshold(3)
            .window(Duration::from_secs(5))
            .reset_timeout(Duration::from_secs(10)),
    );
    breaker.record_failure();
    breaker.record_failure();

    tokio::time::advance(Duration::from_secs(6)).await;

    // The two old failures no longer count toward the threshold.
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn success_rate_threshold_trips() {
    let breaker = CircuitBreaker::new(
        CircuitBreakerConfig::new()
            .failure_threshold(3)
            .success_rate_threshold(0.8)
            .window(Duration::from_secs(60))
            .reset_timeout(Duration::from_secs(10)),
    );
    breaker.record_success();
    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);

    // 2 successes / 3 outcomes = 0.67 < 0.8 with enough volume.
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
}

// =========================================================================
// execute()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn execute_records_outcomes() {
    let breaker = Arc::new(breaker(2, Duration::from_secs(10)));

    let failing = || async {
        Err::<(), _>(GarmrError::Api {
            status: 500,
            message: "boom".into(),
        })
    };
    assert!(breaker.execute(failing).await.is_err());
    assert!(breaker.execute(failing).await.is_err());
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn execute_rejects_without_invoking_when_open() {
    let breaker = breaker(1, Duration::from_secs(10));
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    let calls = AtomicU32::new(0);
    let result: Result<()> = breaker
        .execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0, "fn must not run while open");
    match result {
        Err(GarmrError::CircuitOpen { retry_in }) => {
            assert!(retry_in > Duration::ZERO);
            assert!(retry_in <= Duration::from_secs(10));
        }
        other => panic!("expected CircuitOpen, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn execute_rethrows_failures_unchanged() {
    let breaker = breaker(5, Duration::from_secs(10));
    let result: Result<()> = breaker
        .execute(|| async {
            Err(GarmrError::Api {
                status: 418,
                message: "teapot".into(),
            })
        })
        .await;
    assert!(matches!(result, Err(GarmrError::Api { status: 418, .. })));
}

// =========================================================================
// Manual overrides
// =========================================================================

#[tokio::test(start_paused = true)]
async fn force_open_and_close() {
    let breaker = breaker(3, Duration::from_secs(10));
    breaker.force_open();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.is_allowed());

    breaker.force_close();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

// =========================================================================
// End-to-end scenario from the design review
// =========================================================================

#[tokio::test(start_paused = true)]
async fn open_half_open_closed_cycle() {
    let breaker = breaker(3, Duration::from_millis(10_000));

    for _ in 0..3 {
        breaker.record_failure();
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_millis(10_001)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

//! Tests for [`ModelFallbackManager`] — priority routing, health
//! tracking, fallback eligibility, and lazy auto-recovery.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use garmr::fallback::{FallbackConfig, ModelConfig, ModelFallbackManager};
use garmr::{GarmrError, Result};

fn manager(max_failures: usize, recovery: Duration) -> ModelFallbackManager {
    ModelFallbackManager::new(
        FallbackConfig::new()
            .max_failures(max_failures)
            .recovery_timeout(recovery),
    )
}

fn two_model_manager() -> ModelFallbackManager {
    let manager = manager(3, Duration::from_secs(60));
    manager.add_model(ModelConfig::new("model-a", 1));
    manager.add_model(ModelConfig::new("model-b", 2));
    manager
}

fn api_error(status: u16) -> GarmrError {
    GarmrError::Api {
        status,
        message: format!("status {status}"),
    }
}

// =========================================================================
// Current-model selection and health tracking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn current_model_is_lowest_priority_healthy() {
    let manager = two_model_manager();
    assert_eq!(manager.current_model().as_deref(), Some("model-a"));
}

#[tokio::test(start_paused = true)]
async fn threshold_failures_switch_current_model() {
    let manager = two_model_manager();
    for _ in 0..3 {
        manager.record_failure("model-a");
    }
    assert_eq!(manager.current_model().as_deref(), Some("model-b"));

    let statuses = manager.model_statuses();
    assert!(!statuses[0].healthy);
    assert_eq!(statuses[0].failure_count, 3);
    assert!(statuses[1].healthy);
}

#[tokio::test(start_paused = true)]
async fn success_resets_failure_count() {
    let manager = two_model_manager();
    manager.record_failure("model-a");
    manager.record_failure("model-a");
    manager.record_success("model-a");

    let statuses = manager.model_statuses();
    assert_eq!(statuses[0].failure_count, 0);
    assert!(statuses[0].healthy);
}

#[tokio::test(start_paused = true)]
async fn unhealthy_model_auto_recovers_after_timeout() {
    let manager = two_model_manager();
    for _ in 0..3 {
        manager.record_failure("model-a");
    }
    assert_eq!(manager.current_model().as_deref(), Some("model-b"));

    tokio::time::advance(Duration::from_secs(61)).await;

    // Recovery is lazy: the next read restores the higher-priority model.
    assert_eq!(manager.current_model().as_deref(), Some("model-a"));
    let statuses = manager.model_statuses();
    assert!(statuses[0].healthy);
    assert_eq!(statuses[0].failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn auto_recovery_can_be_disabled() {
    let manager = ModelFallbackManager::new(
        FallbackConfig::new()
            .max_failures(1)
            .recovery_timeout(Duration::from_secs(1))
            .auto_recovery(false),
    );
    manager.add_model(ModelConfig::new("model-a", 1));
    manager.record_failure("model-a");

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_eq!(manager.current_model(), None);
}

#[tokio::test(start_paused = true)]
async fn remove_model_drops_it_from_the_chain() {
    let manager = two_model_manager();
    manager.remove_model("model-a");
    assert_eq!(manager.current_model().as_deref(), Some("model-b"));
    assert_eq!(manager.model_statuses().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_overrides() {
    let manager = two_model_manager();
    manager.force_unhealthy("model-a");
    assert_eq!(manager.current_model().as_deref(), Some("model-b"));

    manager.force_healthy("model-a");
    assert_eq!(manager.current_model().as_deref(), Some("model-a"));
}

// =========================================================================
// execute_with_fallback
// =========================================================================

#[tokio::test(start_paused = true)]
async fn executes_against_the_primary_first() {
    let manager = two_model_manager();
    let outcome = manager
        .execute_with_fallback(|model| async move { Ok::<_, GarmrError>(model) })
        .await
        .unwrap();
    assert_eq!(outcome.model, "model-a");
    assert_eq!(outcome.result, "model-a");
}

#[tokio::test(start_paused = true)]
async fn falls_through_on_server_error() {
    let manager = two_model_manager();
    let outcome = manager
        .execute_with_fallback(|model| async move {
            if model == "model-a" {
                Err(api_error(503))
            } else {
                Ok(format!("answer from {model}"))
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.model, "model-b");
    let statuses = manager.model_statuses();
    assert_eq!(statuses[0].failure_count, 1, "primary failure recorded");
    assert_eq!(statuses[1].failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_fallback_eligible() {
    let manager = two_model_manager();
    let outcome = manager
        .execute_with_fallback(|model| async move {
            if model == "model-a" {
                Err(GarmrError::RateLimited { retry_after: None })
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();
    assert_eq!(outcome.model, "model-b");
}

#[tokio::test(start_paused = true)]
async fn client_error_stops_the_chain() {
    let manager = two_model_manager();
    let calls = AtomicU32::new(0);

    let result: Result<_> = manager
        .execute_with_fallback(|_model| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(api_error(400)) }
        })
        .await;

    assert!(matches!(result, Err(GarmrError::Api { status: 400, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no further models tried");
}

#[tokio::test(start_paused = true)]
async fn exhausted_chain_rethrows_last_error() {
    let manager = two_model_manager();
    let result: Result<_> = manager
        .execute_with_fallback(|model| async move {
            if model == "model-a" {
                Err::<(), _>(api_error(500))
            } else {
                Err(api_error(502))
            }
        })
        .await;
    assert!(matches!(result, Err(GarmrError::Api { status: 502, .. })));
}

#[tokio::test(start_paused = true)]
async fn empty_registry_fails_before_invoking() {
    let manager = manager(3, Duration::from_secs(60));
    let calls = AtomicU32::new(0);

    let result: Result<_> = manager
        .execute_with_fallback(|_model| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(matches!(result, Err(GarmrError::NoHealthyModels)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn fully_unhealthy_chain_fails_before_invoking() {
    let manager = ModelFallbackManager::new(
        FallbackConfig::new()
            .max_failures(1)
            .recovery_timeout(Duration::from_secs(60))
            .auto_recovery(false),
    );
    manager.add_model(ModelConfig::new("model-a", 1));
    manager.record_failure("model-a");

    let result: Result<_> = manager
        .execute_with_fallback(|_model| async { Ok(()) })
        .await;
    assert!(matches!(result, Err(GarmrError::NoHealthyModels)));
}

#[tokio::test(start_paused = true)]
async fn success_through_fallback_marks_winner_healthy() {
    let manager = two_model_manager();
    manager.record_failure("model-b");

    let outcome = manager
        .execute_with_fallback(|model| async move {
            if model == "model-a" {
                Err(api_error(500))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.model, "model-b");
    let statuses = manager.model_statuses();
    assert_eq!(statuses[1].failure_count, 0, "success reset the counter");
}

use super::*;
use crate::error::Error;
use crate::quota::{MemoryQuotaStore, MockQuotaStore, QuotaStore, StoreError};
use crate::usage::{InMemoryUsageRecorder, MockUsageRecorder};
use chatgate_llm::{ProviderFailure, ScriptedProvider};

fn caller(limit: u64) -> ResolvedCaller {
    ResolvedCaller {
        identity: "ak_test_0123456789".to_string(),
        name: None,
        daily_limit: limit,
    }
}

fn request(limit: u64, model: Option<&str>) -> GenerateRequest {
    GenerateRequest {
        caller: caller(limit),
        prompt: "What is Rust?".to_string(),
        model: model.map(str::to_string),
        source_address: "203.0.113.9".to_string(),
    }
}

fn refused() -> ProviderFailure {
    ProviderFailure::Connect("failed to connect to ollama".to_string())
}

struct Harness {
    gateway: Gateway,
    recorder: Arc<InMemoryUsageRecorder>,
    metrics: GatewayMetrics,
}

fn harness(store: Arc<dyn QuotaStore>, dispatcher: Dispatcher) -> Harness {
    let metrics = GatewayMetrics::default();
    let recorder = Arc::new(InMemoryUsageRecorder::new());
    let gateway = Gateway::new(
        AdmissionGate::new(store, metrics.clone()),
        Arc::new(dispatcher),
        recorder.clone(),
        metrics.clone(),
    );
    Harness {
        gateway,
        recorder,
        metrics,
    }
}

fn healthy_chain() -> Dispatcher {
    Dispatcher::new()
        .with_provider(Arc::new(
            ScriptedProvider::replying("ollama", "Rust is a systems language.").with_model("llama2"),
        ))
        .with_provider(Arc::new(ScriptedProvider::replying("huggingface", "unused")))
}

#[tokio::test]
async fn test_limit_two_third_request_denied() {
    let h = harness(Arc::new(MemoryQuotaStore::new()), healthy_chain());

    let first = h.gateway.handle(request(2, None)).await.unwrap();
    let second = h.gateway.handle(request(2, None)).await.unwrap();
    let third = h.gateway.handle(request(2, None)).await.unwrap_err();

    assert_eq!(first.remaining, Remaining::Known(1));
    assert_eq!(second.remaining, Remaining::Known(0));
    assert!(matches!(third.error, GatewayError::QuotaDenied));
    assert_eq!(third.remaining, Remaining::Known(0));

    assert_eq!(h.recorder.len(), 2);
    assert_eq!(h.metrics.requests.get(&[("outcome", "served")]), 2);
    assert_eq!(h.metrics.requests.get(&[("outcome", "denied")]), 1);
}

#[tokio::test]
async fn test_fallback_records_exactly_once() {
    let dispatcher = Dispatcher::new()
        .with_provider(Arc::new(ScriptedProvider::failing("ollama", refused())))
        .with_provider(Arc::new(
            ScriptedProvider::replying("gemini", "From the cloud").with_model("gemini-2.5-flash"),
        ));
    let h = harness(Arc::new(MemoryQuotaStore::new()), dispatcher);

    let served = h.gateway.handle(request(10, None)).await.unwrap();

    assert_eq!(served.provider_used, "gemini:gemini-2.5-flash");
    assert_eq!(served.attempts.len(), 2);
    assert!(served.recorded);

    let records = h.recorder.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].provider_used, "gemini:gemini-2.5-flash");
    assert_eq!(records[0].message, "What is Rust?");
    assert_eq!(records[0].source_address, "203.0.113.9");
    assert_eq!(
        h.metrics
            .dispatch_attempts
            .get(&[("provider", "ollama"), ("status", "failure")]),
        1
    );
}

#[tokio::test]
async fn test_explicit_provider_failure_is_not_exhaustion() {
    let dispatcher = Dispatcher::new()
        .with_provider(Arc::new(ScriptedProvider::failing("ollama", refused())))
        .with_provider(Arc::new(ScriptedProvider::replying("huggingface", "fallback")));
    let h = harness(Arc::new(MemoryQuotaStore::new()), dispatcher);

    let rejection = h
        .gateway
        .handle(request(5, Some("ollama:mistral")))
        .await
        .unwrap_err();

    match rejection.error {
        GatewayError::Dispatch(DispatchError::Provider { error, .. }) => {
            assert_eq!(error.provider, "ollama");
            assert_eq!(error.cause, refused());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // Admission already consumed a slot
    assert_eq!(rejection.remaining, Remaining::Known(4));
    assert!(h.recorder.is_empty());
    assert_eq!(h.metrics.requests.get(&[("outcome", "provider_failed")]), 1);
}

#[tokio::test]
async fn test_all_providers_fail() {
    let dispatcher = Dispatcher::new()
        .with_provider(Arc::new(ScriptedProvider::failing("ollama", refused())))
        .with_provider(Arc::new(ScriptedProvider::failing(
            "gemini",
            ProviderFailure::Status {
                status: 500,
                message: "internal".to_string(),
            },
        )))
        .with_provider(Arc::new(ScriptedProvider::failing(
            "huggingface",
            ProviderFailure::Timeout(120_000),
        )));
    let h = harness(Arc::new(MemoryQuotaStore::new()), dispatcher);

    let rejection = h.gateway.handle(request(5, None)).await.unwrap_err();

    match &rejection.error {
        GatewayError::Dispatch(DispatchError::AllProvidersExhausted { causes, .. }) => {
            assert_eq!(causes.len(), 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(h.recorder.is_empty());
    assert_eq!(h.metrics.requests.get(&[("outcome", "exhausted")]), 1);
    for provider in ["ollama", "gemini", "huggingface"] {
        let latency = h
            .metrics
            .provider_latency
            .get(&[("provider", provider)])
            .unwrap();
        assert_eq!(latency.count(), 1, "{}", provider);
    }
}

#[tokio::test]
async fn test_unconfigured_explicit_provider_counts_no_attempt() {
    let h = harness(Arc::new(MemoryQuotaStore::new()), healthy_chain());

    let rejection = h
        .gateway
        .handle(request(5, Some("gemini:gemini-2.5-pro")))
        .await
        .unwrap_err();

    assert!(matches!(
        rejection.error,
        GatewayError::Dispatch(DispatchError::Provider { ref attempts, .. }) if attempts.is_empty()
    ));
    assert_eq!(
        h.metrics
            .dispatch_attempts
            .get(&[("provider", "gemini"), ("status", "failure")]),
        0
    );
    assert!(h
        .metrics
        .provider_latency
        .get(&[("provider", "gemini")])
        .is_none());
    assert_eq!(h.metrics.requests.get(&[("outcome", "provider_failed")]), 1);
}

#[tokio::test]
async fn test_store_down_still_serves() {
    let mut store = MockQuotaStore::new();
    store
        .expect_increment_below()
        .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));
    store.expect_backend().return_const("mock");

    let h = harness(Arc::new(store), healthy_chain());
    let served = h.gateway.handle(request(1, None)).await.unwrap();

    assert_eq!(served.remaining, Remaining::Unknown);
    assert_eq!(served.provider_used, "ollama:llama2");
    assert_eq!(h.recorder.len(), 1);
    assert_eq!(h.metrics.quota_store_unavailable.get(), 1);
}

#[tokio::test]
async fn test_record_failure_does_not_revert_response() {
    let mut recorder = MockUsageRecorder::new();
    recorder
        .expect_record()
        .times(1)
        .returning(|_| Err(Error::Database("disk I/O error".to_string())));

    let metrics = GatewayMetrics::default();
    let gateway = Gateway::new(
        AdmissionGate::new(Arc::new(MemoryQuotaStore::new()), metrics.clone()),
        Arc::new(healthy_chain()),
        Arc::new(recorder),
        metrics.clone(),
    );

    let served = gateway.handle(request(3, None)).await.unwrap();

    assert!(!served.recorded);
    assert_eq!(served.text, "Rust is a systems language.");
    assert_eq!(metrics.usage_record_failures.get(), 1);
}

#[tokio::test]
async fn test_denied_request_never_reaches_recorder() {
    let mut recorder = MockUsageRecorder::new();
    recorder.expect_record().never();

    let metrics = GatewayMetrics::default();
    let gateway = Gateway::new(
        AdmissionGate::new(Arc::new(MemoryQuotaStore::new()), metrics.clone()),
        Arc::new(healthy_chain()),
        Arc::new(recorder),
        metrics,
    );

    let rejection = gateway.handle(request(0, None)).await.unwrap_err();
    assert!(matches!(rejection.error, GatewayError::QuotaDenied));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_respect_remaining_slots() {
    let h = harness(Arc::new(MemoryQuotaStore::new()), healthy_chain());
    let gateway = Arc::new(h.gateway);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.handle(request(5, None)).await })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    let served = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    let denied = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(Rejection { error: GatewayError::QuotaDenied, .. }))))
        .count();

    assert_eq!(served, 5);
    assert_eq!(denied, 1);
    assert_eq!(h.recorder.len(), 5);
    assert_eq!(h.metrics.in_flight.get(), 0);
}

#[tokio::test]
async fn test_quota_snapshot_does_not_consume() {
    let h = harness(Arc::new(MemoryQuotaStore::new()), healthy_chain());
    h.gateway.handle(request(3, None)).await.unwrap();

    let status = h.gateway.quota(&caller(3)).await;
    let again = h.gateway.quota(&caller(3)).await;

    assert_eq!(
        status,
        QuotaStatus {
            limit: 3,
            used: Some(1),
            remaining: Remaining::Known(2)
        }
    );
    assert_eq!(status, again);
}

#[tokio::test]
async fn test_quota_snapshot_with_store_down() {
    let mut store = MockQuotaStore::new();
    store
        .expect_get()
        .returning(|_| Err(StoreError::Timeout(500)));

    let h = harness(Arc::new(store), healthy_chain());
    let status = h.gateway.quota(&caller(7)).await;

    assert_eq!(status.used, None);
    assert_eq!(status.remaining, Remaining::Unknown);
    assert_eq!(
        serde_json::to_value(&status).unwrap(),
        serde_json::json!({"limit": 7, "used": null, "remaining": null})
    );
}

//! Tests for quota module

use super::*;
use crate::metrics::GatewayMetrics;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

fn gate_with(store: Arc<dyn QuotaStore>) -> (AdmissionGate, GatewayMetrics) {
    let metrics = GatewayMetrics::default();
    (AdmissionGate::new(store, metrics.clone()), metrics)
}

fn fixed_clock(y: i32, m: u32, d: u32, h: u32) -> Clock {
    let at = Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
    Arc::new(move || at)
}

#[test]
fn test_quota_key_format() {
    let key = QuotaKey::new("ak_live_123", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    assert_eq!(key.counter_key(), "rate_limit:ak_live_123:2024-03-09");
    assert_eq!(key.audit_key(), "usage:ak_live_123:2024-03-09");
}

#[test]
fn test_quota_key_uses_utc_day() {
    let late = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(
        QuotaKey::at("k", late).counter_key(),
        "rate_limit:k:2024-12-31"
    );
}

#[tokio::test]
async fn test_memory_get_absent_is_zero() {
    let store = MemoryQuotaStore::new();
    assert_eq!(store.get("missing").await.unwrap(), 0);
}

#[tokio::test]
async fn test_memory_increment_and_get() {
    let store = MemoryQuotaStore::new();
    assert_eq!(store.increment_and_get("k").await.unwrap(), 1);
    assert_eq!(store.increment_and_get("k").await.unwrap(), 2);
    assert_eq!(store.get("k").await.unwrap(), 2);
}

#[tokio::test]
async fn test_memory_increment_below_does_not_mutate_at_limit() {
    let store = MemoryQuotaStore::new();
    assert_eq!(store.increment_below("k", 2).await.unwrap(), Some(1));
    assert_eq!(store.increment_below("k", 2).await.unwrap(), Some(2));
    assert_eq!(store.increment_below("k", 2).await.unwrap(), None);
    assert_eq!(store.increment_below("k", 2).await.unwrap(), None);
    assert_eq!(store.get("k").await.unwrap(), 2);
}

#[tokio::test]
async fn test_memory_ttl_set_once_at_creation() {
    let store = MemoryQuotaStore::with_ttl(Duration::from_millis(120));
    store.increment_and_get("k").await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    // A second increment must not push the expiry out
    assert_eq!(store.increment_and_get("k").await.unwrap(), 2);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(store.get("k").await.unwrap(), 0);
    assert_eq!(store.increment_and_get("k").await.unwrap(), 1);
}

#[tokio::test]
async fn test_memory_purge_expired() {
    let store = MemoryQuotaStore::with_ttl(Duration::from_millis(20));
    store.increment_and_get("a").await.unwrap();
    store.increment_and_get("b").await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(store.purge_expired(), 2);
}

#[tokio::test]
async fn test_admit_fresh_day_reports_remaining() {
    let store = Arc::new(MemoryQuotaStore::new());
    let (gate, metrics) = gate_with(store.clone());

    let first = gate.admit("caller-key-0001", 2, "10.0.0.1").await;
    let second = gate.admit("caller-key-0001", 2, "10.0.0.1").await;
    let third = gate.admit("caller-key-0001", 2, "10.0.0.1").await;

    assert_eq!(first, Admission { allowed: true, remaining: Remaining::Known(1) });
    assert_eq!(second, Admission { allowed: true, remaining: Remaining::Known(0) });
    assert_eq!(third, Admission { allowed: false, remaining: Remaining::Known(0) });
    assert_eq!(gate.used_today("caller-key-0001").await.unwrap(), 2);
    assert_eq!(metrics.admissions.get(&[("outcome", "allowed")]), 2);
    assert_eq!(metrics.admissions.get(&[("outcome", "denied")]), 1);
}

#[tokio::test]
async fn test_repeated_denials_leave_counter_unchanged() {
    let store = Arc::new(MemoryQuotaStore::new());
    let (gate, _) = gate_with(store.clone());
    gate.admit("k", 1, "ip").await;

    for _ in 0..5 {
        assert!(!gate.admit("k", 1, "ip").await.allowed);
    }
    assert_eq!(gate.used_today("k").await.unwrap(), 1);
}

#[tokio::test]
async fn test_zero_limit_always_denies() {
    let store = Arc::new(MemoryQuotaStore::new());
    let (gate, _) = gate_with(store.clone());

    let admission = gate.admit("k", 0, "ip").await;
    assert_eq!(admission, Admission { allowed: false, remaining: Remaining::Known(0) });
    assert_eq!(gate.used_today("k").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admissions_never_exceed_limit() {
    let store = Arc::new(MemoryQuotaStore::new());
    let (gate, _) = gate_with(store.clone());
    let gate = Arc::new(gate);

    // Three slots already used, seven remain
    for _ in 0..3 {
        gate.admit("shared", 10, "ip").await;
    }

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.admit("shared", 10, "ip").await })
        })
        .collect();
    let results: Vec<Admission> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|a| a.allowed).count(), 7);
    assert_eq!(results.iter().filter(|a| !a.allowed).count(), 1);
    assert_eq!(gate.used_today("shared").await.unwrap(), 10);
}

#[tokio::test]
async fn test_admission_writes_audit_entry() {
    let store = Arc::new(MemoryQuotaStore::new());
    let (gate, _) = gate_with(store.clone());
    let gate = gate.with_clock(fixed_clock(2024, 5, 1, 8));

    gate.admit("caller", 5, "192.168.1.7").await;
    gate.admit("caller", 5, "192.168.1.8").await;

    let audit = store.audit("usage:caller:2024-05-01").unwrap();
    assert_eq!(audit.count, 2);
    assert_eq!(audit.ip, "192.168.1.8");
}

#[tokio::test]
async fn test_new_day_starts_a_new_counter() {
    let store = Arc::new(MemoryQuotaStore::new());
    let metrics = GatewayMetrics::default();

    let monday = AdmissionGate::new(store.clone(), metrics.clone())
        .with_clock(fixed_clock(2024, 5, 6, 23));
    assert!(monday.admit("k", 1, "ip").await.allowed);
    assert!(!monday.admit("k", 1, "ip").await.allowed);

    let tuesday = AdmissionGate::new(store.clone(), metrics).with_clock(fixed_clock(2024, 5, 7, 0));
    assert_eq!(tuesday.today(), NaiveDate::from_ymd_opt(2024, 5, 7).unwrap());
    assert!(tuesday.admit("k", 1, "ip").await.allowed);
}

#[tokio::test]
async fn test_store_unavailable_fails_open() {
    let mut store = MockQuotaStore::new();
    store
        .expect_increment_below()
        .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));
    store.expect_backend().return_const("mock");
    store.expect_record_audit().never();

    let (gate, metrics) = gate_with(Arc::new(store));
    let admission = gate.admit("caller", 10, "ip").await;

    assert_eq!(admission, Admission { allowed: true, remaining: Remaining::Unknown });
    assert_eq!(metrics.quota_store_unavailable.get(), 1);
    assert_eq!(metrics.admissions.get(&[("outcome", "fail_open")]), 1);
}

#[tokio::test]
async fn test_audit_failure_does_not_block_admission() {
    let mut store = MockQuotaStore::new();
    store.expect_increment_below().returning(|_, _| Ok(Some(1)));
    store
        .expect_record_audit()
        .times(1)
        .returning(|_, _| Err(StoreError::Timeout(500)));

    let (gate, metrics) = gate_with(Arc::new(store));
    let admission = gate.admit("caller", 3, "ip").await;

    assert_eq!(admission, Admission { allowed: true, remaining: Remaining::Known(2) });
    assert_eq!(metrics.quota_store_unavailable.get(), 0);
}

#[tokio::test]
async fn test_unreachable_redis_fails_open() {
    let store = RedisQuotaStore::new(
        RedisQuotaConfig::new("redis://127.0.0.1:1").with_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    tokio_test::assert_err!(store.ping().await);

    let (gate, metrics) = gate_with(Arc::new(store));
    let admission = gate.admit("caller", 10, "ip").await;

    assert!(admission.allowed);
    assert_eq!(admission.remaining, Remaining::Unknown);
    assert_eq!(metrics.quota_store_unavailable.get(), 1);
}

#[test]
fn test_invalid_redis_url_is_configuration_error() {
    assert!(RedisQuotaStore::new(RedisQuotaConfig::new("not a url")).is_err());
}

#[test]
fn test_remaining_serializes_as_nullable_number() {
    assert_eq!(serde_json::to_string(&Remaining::Known(3)).unwrap(), "3");
    assert_eq!(serde_json::to_string(&Remaining::Unknown).unwrap(), "null");
}

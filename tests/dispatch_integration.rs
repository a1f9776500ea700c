//! End-to-end tests for the fan-out pipeline: validation, dispatch,
//! per-subscription bookkeeping and report aggregation, using the
//! in-memory store and a scripted transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use meridian_push_service::notification::{
    DispatchOutcome, NotificationPayload, NotificationRequest, PushDispatcher,
};
use meridian_push_service::push::{PushMessage, PushOutcome, PushTransport};
use meridian_push_service::store::{
    MemorySubscriptionStore, NewSubscription, Subscription, SubscriptionStore,
};

/// Transport scripted per endpoint; unscripted endpoints succeed.
/// Records every payload it was asked to deliver.
#[derive(Default)]
struct ScriptedTransport {
    outcomes: DashMap<String, PushOutcome>,
    payloads: Mutex<Vec<Vec<u8>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn script(&self, endpoint: &str, outcome: PushOutcome) {
        self.outcomes.insert(endpoint.to_string(), outcome);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn deliver(&self, subscription: &Subscription, message: &PushMessage) -> PushOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(message.payload.clone());
        self.outcomes
            .get(&subscription.endpoint)
            .map(|outcome| outcome.clone())
            .unwrap_or(PushOutcome::Delivered)
    }
}

fn notification() -> NotificationRequest {
    NotificationPayload {
        title: Some("New post".to_string()),
        message: Some("A fresh article is live".to_string()),
        ..Default::default()
    }
    .validate()
    .expect("minimal notification should validate")
}

async fn register(store: &MemorySubscriptionStore, endpoint: &str) -> Subscription {
    store
        .insert(NewSubscription {
            endpoint: endpoint.to_string(),
            auth: "auth-secret".to_string(),
            p256dh: "p256dh-key".to_string(),
        })
        .await
        .expect("insert should succeed")
}

fn environment() -> (Arc<MemorySubscriptionStore>, Arc<ScriptedTransport>, PushDispatcher) {
    let store = Arc::new(MemorySubscriptionStore::new());
    let transport = Arc::new(ScriptedTransport::default());
    let dispatcher = PushDispatcher::new(store.clone(), transport.clone());
    (store, transport, dispatcher)
}

// =============================================================================
// Dispatch scenarios
// =============================================================================

#[tokio::test]
async fn test_mixed_outcome_dispatch() {
    let (store, transport, dispatcher) = environment();

    let failing = register(&store, "https://push.example/failing").await;
    let gone = register(&store, "https://push.example/gone").await;
    let healthy = register(&store, "https://push.example/healthy").await;

    transport.script(
        "https://push.example/failing",
        PushOutcome::Transient {
            reason: "connection reset by peer".to_string(),
        },
    );
    transport.script("https://push.example/gone", PushOutcome::Gone);

    let outcome = dispatcher.dispatch(&notification()).await.unwrap();
    let DispatchOutcome::Delivered(report) = outcome else {
        panic!("expected a delivery report");
    };

    assert_eq!(report.total_devices, 3);
    assert_eq!(report.successful_deliveries, 1);
    assert_eq!(report.failed_deliveries, 2);
    assert_eq!(report.delivery_rate, "33.3%");

    // One breakdown entry, keyed by the transient error, one endpoint
    assert_eq!(report.error_breakdown.len(), 1);
    let entry = &report.error_breakdown["connection reset by peer"];
    assert_eq!(entry.count, 1);
    assert_eq!(entry.endpoints, vec!["https://push.example/failing"]);

    // Transient failure: counter incremented, still active
    let failing = store.get(failing.id).unwrap();
    assert!(failing.active);
    assert_eq!(failing.failure_count, 1);
    assert!(failing.last_failure.is_some());

    // Gone: deactivated, failure counter untouched
    let gone = store.get(gone.id).unwrap();
    assert!(!gone.active);
    assert_eq!(gone.failure_count, 0);
    assert!(gone.last_failure.is_none());

    // Success: counter incremented, timestamp stamped
    let healthy = store.get(healthy.id).unwrap();
    assert_eq!(healthy.success_count, 1);
    assert!(healthy.last_success.is_some());
}

#[tokio::test]
async fn test_all_successful_dispatch() {
    let (store, transport, dispatcher) = environment();
    for i in 0..5 {
        register(&store, &format!("https://push.example/{}", i)).await;
    }

    let DispatchOutcome::Delivered(report) = dispatcher.dispatch(&notification()).await.unwrap()
    else {
        panic!("expected a delivery report");
    };

    assert_eq!(report.total_devices, 5);
    assert_eq!(report.successful_deliveries, 5);
    assert_eq!(report.failed_deliveries, 0);
    assert_eq!(report.delivery_rate, "100.0%");
    assert!(report.error_breakdown.is_empty());
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_empty_fleet_issues_no_network_calls() {
    let (_store, transport, dispatcher) = environment();

    let outcome = dispatcher.dispatch(&notification()).await.unwrap();

    assert!(matches!(outcome, DispatchOutcome::NoSubscribers));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_deactivated_subscription_excluded_from_next_dispatch() {
    let (store, transport, dispatcher) = environment();
    register(&store, "https://push.example/gone").await;
    register(&store, "https://push.example/healthy").await;
    transport.script("https://push.example/gone", PushOutcome::Gone);

    dispatcher.dispatch(&notification()).await.unwrap();

    let DispatchOutcome::Delivered(report) = dispatcher.dispatch(&notification()).await.unwrap()
    else {
        panic!("expected a delivery report");
    };

    // Second pass only targets the surviving subscription
    assert_eq!(report.total_devices, 1);
    assert_eq!(report.successful_deliveries, 1);
}

#[tokio::test]
async fn test_payload_serialized_once_and_shared() {
    let (store, transport, dispatcher) = environment();
    for i in 0..4 {
        register(&store, &format!("https://push.example/{}", i)).await;
    }

    dispatcher.dispatch(&notification()).await.unwrap();

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 4);
    assert!(payloads.windows(2).all(|pair| pair[0] == pair[1]));

    let value: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
    assert_eq!(value["title"], "New post");
    // Absent optional fields are omitted, not null
    assert!(value.get("icon").is_none());
}

#[tokio::test]
async fn test_error_breakdown_totals_match_transient_failures() {
    let (store, transport, dispatcher) = environment();
    for i in 0..3 {
        let endpoint = format!("https://push.example/timeout/{}", i);
        register(&store, &endpoint).await;
        transport.script(
            &endpoint,
            PushOutcome::Transient {
                reason: "request timed out".to_string(),
            },
        );
    }
    let reset = "https://push.example/reset";
    register(&store, reset).await;
    transport.script(
        reset,
        PushOutcome::Transient {
            reason: "connection reset by peer".to_string(),
        },
    );

    let DispatchOutcome::Delivered(report) = dispatcher.dispatch(&notification()).await.unwrap()
    else {
        panic!("expected a delivery report");
    };

    assert_eq!(report.failed_deliveries, 4);

    // Per-error endpoint lists are disjoint and cover every failure
    let mut seen: Vec<&String> = report
        .error_breakdown
        .values()
        .flat_map(|entry| entry.endpoints.iter())
        .collect();
    let listed = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), listed);

    let counted: usize = report.error_breakdown.values().map(|e| e.count).sum();
    assert_eq!(counted, report.failed_deliveries);
}

#[tokio::test]
async fn test_concurrent_dispatches_are_independent() {
    let (store, _transport, dispatcher) = environment();
    for i in 0..8 {
        register(&store, &format!("https://push.example/{}", i)).await;
    }
    let dispatcher = Arc::new(dispatcher);

    let request = notification();
    let (first, second) = tokio::join!(dispatcher.dispatch(&request), dispatcher.dispatch(&request));

    assert!(matches!(first.unwrap(), DispatchOutcome::Delivered(_)));
    assert!(matches!(second.unwrap(), DispatchOutcome::Delivered(_)));

    let stats = dispatcher.stats();
    assert_eq!(stats.notifications_sent, 2);
    assert_eq!(stats.deliveries_succeeded, 16);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_registration_is_idempotent() {
    let store = MemorySubscriptionStore::new();

    let first = register(&store, "https://push.example/device").await;
    let second = register(&store, "https://push.example/device").await;

    assert_eq!(first.id, second.id);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_unsubscribe_hard_deletes() {
    let store = MemorySubscriptionStore::new();
    register(&store, "https://push.example/device").await;

    assert!(store
        .delete_by_endpoint("https://push.example/device")
        .await
        .unwrap());
    assert_eq!(store.len(), 0);
    assert!(store.list_active().await.unwrap().is_empty());
}

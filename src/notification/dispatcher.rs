//! Fan-out dispatcher.
//!
//! Delivers one validated notification to every active subscription,
//! classifies each outcome, updates per-subscription health state in the
//! store and aggregates a [`DeliveryReport`]. Holds no state across calls
//! beyond monotonic statistics counters, so concurrent dispatches are safe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::error::AppError;
use crate::metrics::DeliveryMetrics;
use crate::push::{PushMessage, PushOutcome, PushTransport};
use crate::store::{Subscription, SubscriptionStore};

use super::report::{DeliveryOutcome, DeliveryReport};
use super::request::NotificationRequest;

/// Default cap on in-flight deliveries during a fan-out
pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 100;

/// Result of one dispatch call.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Every subscription was attempted; the report covers all of them
    Delivered(DeliveryReport),
    /// No active subscriptions existed; nothing was sent
    NoSubscribers,
}

/// Process-lifetime statistics for the dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Notifications accepted for fan-out
    pub notifications_sent: AtomicU64,
    /// Per-device successful deliveries
    pub deliveries_succeeded: AtomicU64,
    /// Per-device transient failures
    pub deliveries_failed: AtomicU64,
    /// Subscriptions deactivated as permanently gone
    pub subscriptions_expired: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            subscriptions_expired: self.subscriptions_expired.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub notifications_sent: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub subscriptions_expired: u64,
}

/// Fans one notification out to every active subscription.
pub struct PushDispatcher {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn PushTransport>,
    max_concurrent_sends: usize,
    stats: DispatcherStats,
}

impl PushDispatcher {
    pub fn new(store: Arc<dyn SubscriptionStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self::with_concurrency(store, transport, DEFAULT_MAX_CONCURRENT_SENDS)
    }

    pub fn with_concurrency(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
        max_concurrent_sends: usize,
    ) -> Self {
        Self {
            store,
            transport,
            max_concurrent_sends: max_concurrent_sends.max(1),
            stats: DispatcherStats::default(),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Deliver `request` to every active subscription.
    ///
    /// Store and serialization errors before the fan-out are fatal for the
    /// whole call; a single subscription's delivery failure is recorded in
    /// the report and never propagated.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, request),
        fields(title = %request.title)
    )]
    pub async fn dispatch(&self, request: &NotificationRequest) -> Result<DispatchOutcome, AppError> {
        let started = Instant::now();

        let subscriptions = self.store.list_active().await?;
        if subscriptions.is_empty() {
            tracing::info!("No active subscriptions, nothing to dispatch");
            return Ok(DispatchOutcome::NoSubscribers);
        }

        // Serialize once and share the bytes across every recipient
        let message = Arc::new(PushMessage {
            payload: request.to_wire_bytes()?,
            ttl: request.ttl,
            urgency: request.urgency,
            topic: request.topic.clone(),
        });

        let fanout = subscriptions.len();
        let mut futures = FuturesUnordered::new();
        let mut outcomes = Vec::with_capacity(fanout);
        let mut in_flight = 0;

        for subscription in subscriptions {
            let transport = Arc::clone(&self.transport);
            let message = Arc::clone(&message);
            futures.push(async move {
                let outcome = transport.deliver(&subscription, &message).await;
                (subscription, outcome)
            });
            in_flight += 1;

            // Drain completed sends once the concurrency cap is reached
            while in_flight >= self.max_concurrent_sends {
                if let Some((subscription, outcome)) = futures.next().await {
                    in_flight -= 1;
                    outcomes.push(self.settle(subscription, outcome).await);
                } else {
                    break;
                }
            }
        }

        // Drain the remainder
        while let Some((subscription, outcome)) = futures.next().await {
            outcomes.push(self.settle(subscription, outcome).await);
        }

        let report = DeliveryReport::from_outcomes(&outcomes, started.elapsed());
        let expired = outcomes
            .iter()
            .filter(|o| !o.success && o.error.is_none())
            .count();
        let transient_failures = report.failed_deliveries - expired;

        // Update stats
        self.stats.notifications_sent.fetch_add(1, Ordering::Relaxed);
        self.stats
            .deliveries_succeeded
            .fetch_add(report.successful_deliveries as u64, Ordering::Relaxed);
        self.stats
            .deliveries_failed
            .fetch_add(transient_failures as u64, Ordering::Relaxed);
        self.stats
            .subscriptions_expired
            .fetch_add(expired as u64, Ordering::Relaxed);

        // Update Prometheus metrics
        DeliveryMetrics::record_sent();
        DeliveryMetrics::record_delivered(report.successful_deliveries as u64);
        DeliveryMetrics::record_failed(transient_failures as u64);
        DeliveryMetrics::record_expired(expired as u64);
        DeliveryMetrics::observe_dispatch(fanout, started.elapsed().as_secs_f64());

        tracing::info!(
            total_devices = report.total_devices,
            delivered = report.successful_deliveries,
            failed = report.failed_deliveries,
            expired = expired,
            duration_ms = report.processing_time_ms,
            "Dispatch complete"
        );

        Ok(DispatchOutcome::Delivered(report))
    }

    /// Classify one delivery result and update the subscription's health
    /// state. Bookkeeping errors are logged, never propagated: the outcome
    /// of the push attempt itself is what the report records.
    async fn settle(&self, subscription: Subscription, outcome: PushOutcome) -> DeliveryOutcome {
        match outcome {
            PushOutcome::Delivered => {
                if let Err(e) = self.store.record_success(subscription.id).await {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to record delivery success"
                    );
                }
                DeliveryOutcome::delivered(subscription.endpoint)
            }
            PushOutcome::Gone => {
                // Terminal state: deactivate but keep historical counters;
                // failure_count is untouched
                if let Err(e) = self.store.deactivate(subscription.id).await {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to deactivate gone subscription"
                    );
                }
                tracing::debug!(
                    subscription_id = %subscription.id,
                    endpoint = %subscription.endpoint,
                    "Push service reported endpoint gone, subscription deactivated"
                );
                DeliveryOutcome::failed(subscription.endpoint, None)
            }
            PushOutcome::Transient { reason } => {
                if let Err(e) = self.store.record_failure(subscription.id).await {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        error = %e,
                        "Failed to record delivery failure"
                    );
                }
                DeliveryOutcome::failed(subscription.endpoint, Some(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySubscriptionStore, NewSubscription};
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::sync::atomic::AtomicUsize;

    /// Transport scripted per endpoint; defaults to success.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: DashMap<String, PushOutcome>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn script(&self, endpoint: &str, outcome: PushOutcome) {
            self.outcomes.insert(endpoint.to_string(), outcome);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        async fn deliver(
            &self,
            subscription: &Subscription,
            _message: &PushMessage,
        ) -> PushOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .get(&subscription.endpoint)
                .map(|o| o.clone())
                .unwrap_or(PushOutcome::Delivered)
        }
    }

    fn request() -> NotificationRequest {
        crate::notification::NotificationPayload {
            title: Some("New post".to_string()),
            message: Some("A fresh article is live".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    async fn register(store: &MemorySubscriptionStore, endpoint: &str) -> Subscription {
        store
            .insert(NewSubscription {
                endpoint: endpoint.to_string(),
                auth: "auth".to_string(),
                p256dh: "p256dh".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_fleet_short_circuits() {
        let store = Arc::new(MemorySubscriptionStore::new());
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = PushDispatcher::new(store, transport.clone());

        let outcome = dispatcher.dispatch(&request()).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::NoSubscribers));
        // No network calls for an empty fleet
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_gone_endpoint_deactivated_without_failure_count() {
        let store = Arc::new(MemorySubscriptionStore::new());
        let transport = Arc::new(ScriptedTransport::default());
        let sub = register(&store, "https://push.example/gone").await;
        transport.script("https://push.example/gone", PushOutcome::Gone);

        let dispatcher = PushDispatcher::new(store.clone(), transport);
        let outcome = dispatcher.dispatch(&request()).await.unwrap();

        let DispatchOutcome::Delivered(report) = outcome else {
            panic!("expected a delivery report");
        };
        assert_eq!(report.total_devices, 1);
        assert_eq!(report.failed_deliveries, 1);

        let stored = store.get(sub.id).unwrap();
        assert!(!stored.active);
        assert_eq!(stored.failure_count, 0);
        assert!(stored.last_failure.is_none());
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_dispatches() {
        let store = Arc::new(MemorySubscriptionStore::new());
        let transport = Arc::new(ScriptedTransport::default());
        register(&store, "https://push.example/a").await;
        register(&store, "https://push.example/b").await;

        let dispatcher = PushDispatcher::new(store, transport);
        dispatcher.dispatch(&request()).await.unwrap();
        dispatcher.dispatch(&request()).await.unwrap();

        let stats = dispatcher.stats();
        assert_eq!(stats.notifications_sent, 2);
        assert_eq!(stats.deliveries_succeeded, 4);
        assert_eq!(stats.deliveries_failed, 0);
    }

    #[tokio::test]
    async fn test_fanout_larger_than_concurrency_cap() {
        let store = Arc::new(MemorySubscriptionStore::new());
        let transport = Arc::new(ScriptedTransport::default());
        for i in 0..25 {
            register(&store, &format!("https://push.example/{}", i)).await;
        }

        let dispatcher = PushDispatcher::with_concurrency(store, transport.clone(), 4);
        let outcome = dispatcher.dispatch(&request()).await.unwrap();

        let DispatchOutcome::Delivered(report) = outcome else {
            panic!("expected a delivery report");
        };
        assert_eq!(report.total_devices, 25);
        assert_eq!(report.successful_deliveries, 25);
        assert_eq!(report.delivery_rate, "100.0%");
        assert_eq!(transport.calls(), 25);
    }
}

//! In-memory subscription store.
//!
//! Used by the test suite and for dependency-free local development.
//! Not suitable for production: state does not survive restarts.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::backend::{
    NewSubscription, StoreError, Subscription, SubscriptionStore, SubscriptionTotals,
};

/// DashMap-backed store keyed by subscription ID.
#[derive(Default)]
pub struct MemorySubscriptionStore {
    subscriptions: DashMap<Uuid, Subscription>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, active or not.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Fetch a record by ID (test inspection helper).
    pub fn get(&self, id: Uuid) -> Option<Subscription> {
        self.subscriptions.get(&id).map(|s| s.clone())
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn list_active(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn record_success(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(mut entry) = self.subscriptions.get_mut(&id) {
            entry.last_success = Some(Utc::now());
            entry.success_count += 1;
        }
        Ok(())
    }

    async fn record_failure(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(mut entry) = self.subscriptions.get_mut(&id) {
            entry.last_failure = Some(Utc::now());
            entry.failure_count += 1;
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(mut entry) = self.subscriptions.get_mut(&id) {
            entry.active = false;
        }
        Ok(())
    }

    async fn find_by_endpoint_and_keys(
        &self,
        endpoint: &str,
        auth: &str,
        p256dh: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .find(|entry| {
                entry.endpoint == endpoint && entry.auth == auth && entry.p256dh == p256dh
            })
            .map(|entry| entry.clone()))
    }

    async fn insert(&self, subscription: NewSubscription) -> Result<Subscription, StoreError> {
        if let Some(existing) = self
            .find_by_endpoint_and_keys(
                &subscription.endpoint,
                &subscription.auth,
                &subscription.p256dh,
            )
            .await?
        {
            return Ok(existing);
        }

        let record = Subscription {
            id: Uuid::new_v4(),
            endpoint: subscription.endpoint,
            auth: subscription.auth,
            p256dh: subscription.p256dh,
            active: true,
            last_success: None,
            last_failure: None,
            success_count: 0,
            failure_count: 0,
            created_at: Utc::now(),
        };
        self.subscriptions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|_, sub| sub.endpoint != endpoint);
        Ok(self.subscriptions.len() < before)
    }

    async fn totals(&self) -> Result<SubscriptionTotals, StoreError> {
        let mut total = 0i64;
        let mut active = 0i64;
        let mut total_successes = 0i64;
        let mut total_failures = 0i64;
        let mut rate_sum = 0f64;
        let mut rated = 0i64;

        for entry in self.subscriptions.iter() {
            total += 1;
            if entry.active {
                active += 1;
            }
            total_successes += entry.success_count;
            total_failures += entry.failure_count;
            let attempts = entry.success_count + entry.failure_count;
            if attempts > 0 {
                rate_sum += entry.success_count as f64 / attempts as f64;
                rated += 1;
            }
        }

        Ok(SubscriptionTotals {
            total,
            active,
            total_successes,
            total_failures,
            average_success_rate: if rated > 0 { rate_sum / rated as f64 } else { 0.0 },
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(endpoint: &str) -> NewSubscription {
        NewSubscription {
            endpoint: endpoint.to_string(),
            auth: "auth-secret".to_string(),
            p256dh: "p256dh-key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = MemorySubscriptionStore::new();

        let first = store.insert(sample("https://push.example/a")).await.unwrap();
        let second = store.insert(sample("https://push.example/a")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_deactivate_preserves_counters() {
        let store = MemorySubscriptionStore::new();
        let sub = store.insert(sample("https://push.example/a")).await.unwrap();

        store.record_success(sub.id).await.unwrap();
        store.deactivate(sub.id).await.unwrap();

        let stored = store.get(sub.id).unwrap();
        assert!(!stored.active);
        assert_eq!(stored.success_count, 1);
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_endpoint() {
        let store = MemorySubscriptionStore::new();
        store.insert(sample("https://push.example/a")).await.unwrap();

        assert!(store.delete_by_endpoint("https://push.example/a").await.unwrap());
        assert!(!store.delete_by_endpoint("https://push.example/a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_totals_aggregation() {
        let store = MemorySubscriptionStore::new();
        let a = store.insert(sample("https://push.example/a")).await.unwrap();
        let b = store.insert(sample("https://push.example/b")).await.unwrap();

        store.record_success(a.id).await.unwrap();
        store.record_success(a.id).await.unwrap();
        store.record_failure(b.id).await.unwrap();
        store.deactivate(b.id).await.unwrap();

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.total, 2);
        assert_eq!(totals.active, 1);
        assert_eq!(totals.total_successes, 2);
        assert_eq!(totals.total_failures, 1);
        // a: 2/2 = 1.0, b: 0/1 = 0.0 -> mean 0.5
        assert!((totals.average_success_rate - 0.5).abs() < f64::EPSILON);
    }
}

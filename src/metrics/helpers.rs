//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DELIVERIES_FAILED_TOTAL, DELIVERIES_SUCCEEDED_TOTAL, DISPATCH_DURATION_SECONDS,
    DISPATCH_FANOUT_SIZE, NOTIFICATIONS_SENT_TOTAL, RATELIMIT_ALLOWED_TOTAL,
    RATELIMIT_DENIED_TOTAL, SUBSCRIPTIONS_ACTIVE, SUBSCRIPTIONS_EXPIRED_TOTAL,
    SUBSCRIPTIONS_REGISTERED_TOTAL, SUBSCRIPTIONS_REMOVED_TOTAL, SUBSCRIPTIONS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording delivery metrics
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record a notification accepted for fan-out
    pub fn record_sent() {
        NOTIFICATIONS_SENT_TOTAL.inc();
    }

    /// Record successful per-device deliveries
    pub fn record_delivered(count: u64) {
        DELIVERIES_SUCCEEDED_TOTAL.inc_by(count);
    }

    /// Record failed per-device deliveries
    pub fn record_failed(count: u64) {
        DELIVERIES_FAILED_TOTAL.inc_by(count);
    }

    /// Record subscriptions deactivated as gone
    pub fn record_expired(count: u64) {
        SUBSCRIPTIONS_EXPIRED_TOTAL.inc_by(count);
    }

    /// Record fan-out size and duration
    pub fn observe_dispatch(devices: usize, duration_seconds: f64) {
        DISPATCH_FANOUT_SIZE.observe(devices as f64);
        DISPATCH_DURATION_SECONDS.observe(duration_seconds);
    }
}

/// Helper struct for recording subscription metrics
pub struct SubscriptionMetrics;

impl SubscriptionMetrics {
    /// Record a newly registered subscription
    pub fn record_registered() {
        SUBSCRIPTIONS_REGISTERED_TOTAL.inc();
    }

    /// Record an explicit unsubscribe
    pub fn record_removed() {
        SUBSCRIPTIONS_REMOVED_TOTAL.inc();
    }

    /// Update the stored/active gauges (called when totals are computed)
    pub fn set_totals(total: i64, active: i64) {
        SUBSCRIPTIONS_TOTAL.set(total);
        SUBSCRIPTIONS_ACTIVE.set(active);
    }
}

/// Helper struct for recording rate limit metrics
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    /// Record an allowed trigger call
    pub fn record_allowed() {
        RATELIMIT_ALLOWED_TOTAL.inc();
    }

    /// Record a denied trigger call
    pub fn record_denied() {
        RATELIMIT_DENIED_TOTAL.inc();
    }
}

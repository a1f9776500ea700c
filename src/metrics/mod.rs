//! Prometheus metrics for the push delivery service.
//!
//! - Delivery metrics (notifications sent, per-device outcomes)
//! - Dispatch metrics (fan-out size, duration)
//! - Subscription metrics (registered, removed, active gauge)
//! - Rate limiting metrics

mod helpers;

pub use helpers::{encode_metrics, DeliveryMetrics, RateLimitMetrics, SubscriptionMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "meridian";

lazy_static! {
    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Notifications accepted for fan-out
    pub static ref NOTIFICATIONS_SENT_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_sent_total", METRIC_PREFIX),
        "Total notifications accepted for fan-out"
    ).unwrap();

    /// Per-device successful deliveries
    pub static ref DELIVERIES_SUCCEEDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_deliveries_succeeded_total", METRIC_PREFIX),
        "Total successful per-device deliveries"
    ).unwrap();

    /// Per-device failed deliveries (transient failures)
    pub static ref DELIVERIES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_deliveries_failed_total", METRIC_PREFIX),
        "Total failed per-device deliveries"
    ).unwrap();

    /// Subscriptions deactivated after the push service reported them gone
    pub static ref SUBSCRIPTIONS_EXPIRED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_subscriptions_expired_total", METRIC_PREFIX),
        "Total subscriptions deactivated as permanently gone"
    ).unwrap();

    /// Wall-clock duration of a full fan-out
    pub static ref DISPATCH_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_dispatch_duration_seconds", METRIC_PREFIX),
        "Fan-out duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    /// Number of devices targeted per fan-out
    pub static ref DISPATCH_FANOUT_SIZE: Histogram = register_histogram!(
        format!("{}_dispatch_fanout_size", METRIC_PREFIX),
        "Devices targeted per fan-out",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    ).unwrap();

    // ============================================================================
    // Subscription Metrics
    // ============================================================================

    /// Stored subscriptions (active or not)
    pub static ref SUBSCRIPTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_subscriptions_total", METRIC_PREFIX),
        "Total stored subscriptions"
    ).unwrap();

    /// Subscriptions currently eligible for delivery
    pub static ref SUBSCRIPTIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_subscriptions_active", METRIC_PREFIX),
        "Subscriptions currently eligible for delivery"
    ).unwrap();

    /// New subscriptions registered
    pub static ref SUBSCRIPTIONS_REGISTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_subscriptions_registered_total", METRIC_PREFIX),
        "Total subscriptions registered"
    ).unwrap();

    /// Subscriptions removed by explicit unsubscribe
    pub static ref SUBSCRIPTIONS_REMOVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_subscriptions_removed_total", METRIC_PREFIX),
        "Total subscriptions removed by unsubscribe"
    ).unwrap();

    // ============================================================================
    // Rate Limiting Metrics
    // ============================================================================

    /// Trigger calls allowed through the rate limiter
    pub static ref RATELIMIT_ALLOWED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_allowed_total", METRIC_PREFIX),
        "Trigger calls allowed by the rate limiter"
    ).unwrap();

    /// Trigger calls denied by the rate limiter
    pub static ref RATELIMIT_DENIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_ratelimit_denied_total", METRIC_PREFIX),
        "Trigger calls denied by the rate limiter"
    ).unwrap();
}

//! Subscription registration, removal and aggregate statistics.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics::SubscriptionMetrics;
use crate::notification::FieldIssue;
use crate::server::AppState;
use crate::store::NewSubscription;

/// Browser push subscription as submitted by the client, matching the
/// PushSubscription JSON shape.
#[derive(Debug, Deserialize)]
pub struct RegisterSubscriptionRequest {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionKeys {
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub p256dh: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSubscriptionResponse {
    pub success: bool,
    pub id: Uuid,
    /// False when the identical subscription was already registered
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatsResponse {
    pub total_subscriptions: i64,
    pub active_subscriptions: i64,
    pub total_successes: i64,
    pub total_failures: i64,
    /// Mean per-subscription success ratio as a percentage string
    pub average_success_rate: String,
    pub dispatcher: DispatcherSummary,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherSummary {
    pub notifications_sent: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub subscriptions_expired: u64,
}

fn validate_registration(request: &RegisterSubscriptionRequest) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if request.endpoint.trim().is_empty() {
        issues.push(FieldIssue {
            field: "endpoint".to_string(),
            message: "is required".to_string(),
        });
    } else if url::Url::parse(&request.endpoint).is_err() {
        issues.push(FieldIssue {
            field: "endpoint".to_string(),
            message: "must be a valid absolute URL".to_string(),
        });
    }
    if request.keys.auth.trim().is_empty() {
        issues.push(FieldIssue {
            field: "keys.auth".to_string(),
            message: "is required".to_string(),
        });
    }
    if request.keys.p256dh.trim().is_empty() {
        issues.push(FieldIssue {
            field: "keys.p256dh".to_string(),
            message: "is required".to_string(),
        });
    }
    issues
}

/// Register a push subscription. Idempotent: submitting the identical
/// subscription twice leaves exactly one stored record.
#[tracing::instrument(name = "api.register_subscription", skip(state, request))]
pub async fn register_subscription(
    State(state): State<AppState>,
    Json(request): Json<RegisterSubscriptionRequest>,
) -> Result<(StatusCode, Json<RegisterSubscriptionResponse>)> {
    let issues = validate_registration(&request);
    if !issues.is_empty() {
        return Err(AppError::Validation(issues));
    }

    if let Some(existing) = state
        .store
        .find_by_endpoint_and_keys(&request.endpoint, &request.keys.auth, &request.keys.p256dh)
        .await?
    {
        tracing::debug!(subscription_id = %existing.id, "Subscription already registered");
        return Ok((
            StatusCode::OK,
            Json(RegisterSubscriptionResponse {
                success: true,
                id: existing.id,
                created: false,
            }),
        ));
    }

    let subscription = state
        .store
        .insert(NewSubscription {
            endpoint: request.endpoint,
            auth: request.keys.auth,
            p256dh: request.keys.p256dh,
        })
        .await?;

    SubscriptionMetrics::record_registered();
    tracing::info!(subscription_id = %subscription.id, "Subscription registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterSubscriptionResponse {
            success: true,
            id: subscription.id,
            created: true,
        }),
    ))
}

/// Explicit unsubscribe: the only path that hard-deletes a record.
#[tracing::instrument(name = "api.unsubscribe", skip(state, request))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>> {
    let removed = state.store.delete_by_endpoint(&request.endpoint).await?;

    if removed {
        SubscriptionMetrics::record_removed();
        tracing::info!(endpoint = %request.endpoint, "Subscription removed");
    }

    Ok(Json(UnsubscribeResponse {
        success: true,
        removed,
    }))
}

/// Aggregate counters across all stored subscriptions, computed by the
/// store rather than by loading every record into memory.
pub async fn subscription_stats(
    State(state): State<AppState>,
) -> Result<Json<SubscriptionStatsResponse>> {
    let totals = state.store.totals().await?;
    let dispatcher = state.dispatcher.stats();

    SubscriptionMetrics::set_totals(totals.total, totals.active);

    Ok(Json(SubscriptionStatsResponse {
        total_subscriptions: totals.total,
        active_subscriptions: totals.active,
        total_successes: totals.total_successes,
        total_failures: totals.total_failures,
        average_success_rate: format!("{:.1}%", totals.average_success_rate * 100.0),
        dispatcher: DispatcherSummary {
            notifications_sent: dispatcher.notifications_sent,
            deliveries_succeeded: dispatcher.deliveries_succeeded,
            deliveries_failed: dispatcher.deliveries_failed,
            subscriptions_expired: dispatcher.subscriptions_expired,
        },
        timestamp: Utc::now(),
    }))
}

//! HTTP trigger handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::Claims;
use crate::error::{AppError, Result};
use crate::metrics::RateLimitMetrics;
use crate::notification::{DispatchOutcome, NotificationPayload};
use crate::ratelimit::RateLimitResult;
use crate::server::middleware::rate_limit_response;
use crate::server::AppState;

/// Validate an inbound notification and fan it out to every active
/// subscription. The caller always receives either the field-issue list,
/// a no-subscriptions body, or a complete delivery report.
#[tracing::instrument(
    name = "http.send_notification",
    skip(state, claims, payload),
    fields(caller = %claims.caller_id())
)]
pub async fn send_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NotificationPayload>,
) -> Result<Response> {
    // Fixed-window limit keyed by the authenticated caller
    if let RateLimitResult::Denied {
        retry_after,
        limit,
        reset_at,
    } = state.rate_limiter.check(claims.caller_id())
    {
        RateLimitMetrics::record_denied();
        tracing::warn!(
            caller = %claims.caller_id(),
            retry_after = retry_after,
            "Trigger rate limit exceeded"
        );
        return Ok(rate_limit_response(retry_after, limit, reset_at));
    }
    RateLimitMetrics::record_allowed();

    let request = payload.validate().map_err(AppError::Validation)?;

    match state.dispatcher.dispatch(&request).await? {
        DispatchOutcome::Delivered(report) => Ok((
            StatusCode::OK,
            Json(super::models::SendNotificationResponse {
                success: true,
                report,
                timestamp: Utc::now(),
            }),
        )
            .into_response()),
        DispatchOutcome::NoSubscribers => Ok((
            StatusCode::NOT_FOUND,
            Json(super::models::NoSubscribersResponse::new()),
        )
            .into_response()),
    }
}

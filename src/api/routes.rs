use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::middleware::jwt_auth;
use crate::server::AppState;
use crate::triggers::send_notification;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::subscriptions::{register_subscription, subscription_stats, unsubscribe};

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Trigger endpoint requires an authenticated caller
    let protected = Router::new()
        .route("/notifications/send", post(send_notification))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth));

    // Browser-facing subscription management
    let public = Router::new()
        .route(
            "/subscriptions",
            post(register_subscription).delete(unsubscribe),
        )
        .route("/subscriptions/stats", get(subscription_stats));

    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/v1", protected.merge(public))
}

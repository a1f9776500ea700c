use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AppError;

use super::AppState;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// JWT authentication middleware for the trigger endpoint.
///
/// Validates the bearer token and stores the claims in request extensions
/// for the handler to key its rate limit on.
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

    let claims = state.jwt_validator.validate(token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Build a rate limit error response with proper headers
pub fn rate_limit_response(retry_after: u64, limit: u32, reset_at: i64) -> Response {
    let body = json!({
        "error": {
            "code": "RATE_LIMITED",
            "message": format!("Too many requests, please retry after {} seconds", retry_after)
        }
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
        headers.insert("Retry-After", v);
    }
    if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    if let Ok(v) = HeaderValue::from_str("0") {
        headers.insert("X-RateLimit-Remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }

    response
}

//! Request and response models for the trigger endpoint

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::notification::DeliveryReport;

/// Response for a completed fan-out
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub report: DeliveryReport,
    pub timestamp: DateTime<Utc>,
}

/// Response when no active subscriptions exist; nothing was sent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoSubscribersResponse {
    pub success: bool,
    pub code: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl NoSubscribersResponse {
    pub fn new() -> Self {
        Self {
            success: false,
            code: "NO_ACTIVE_SUBSCRIPTIONS",
            message: "No active subscriptions to deliver to",
            timestamp: Utc::now(),
        }
    }
}

impl Default for NoSubscribersResponse {
    fn default() -> Self {
        Self::new()
    }
}

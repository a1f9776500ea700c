//! Delivery outcomes and their aggregation into a report.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one delivery attempt. Ephemeral: only the aggregate report
/// leaves the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub endpoint: String,
    /// Present for transient failures; gone endpoints are bookkept via
    /// deactivation and carry no message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl DeliveryOutcome {
    pub fn delivered(endpoint: impl Into<String>) -> Self {
        Self {
            success: true,
            endpoint: endpoint.into(),
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(endpoint: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            endpoint: endpoint.into(),
            error,
            completed_at: Utc::now(),
        }
    }
}

/// Failures sharing one error message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBreakdownEntry {
    pub count: usize,
    pub endpoints: Vec<String>,
}

/// Aggregate result of one fan-out, returned to the trigger caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub total_devices: usize,
    pub successful_deliveries: usize,
    pub failed_deliveries: usize,
    /// Percentage with one decimal place, e.g. "66.7%"
    pub delivery_rate: String,
    pub processing_time_ms: u64,
    /// Error message -> affected endpoints, for failures that carry one
    pub error_breakdown: BTreeMap<String, ErrorBreakdownEntry>,
}

impl DeliveryReport {
    /// Pure aggregation over the outcome list.
    pub fn from_outcomes(outcomes: &[DeliveryOutcome], processing_time: Duration) -> Self {
        let total_devices = outcomes.len();
        let successful_deliveries = outcomes.iter().filter(|o| o.success).count();
        let failed_deliveries = total_devices - successful_deliveries;

        // The dispatcher short-circuits empty fleets before getting here,
        // but never divide by zero regardless
        let delivery_rate = if total_devices == 0 {
            "0.0%".to_string()
        } else {
            format!(
                "{:.1}%",
                successful_deliveries as f64 * 100.0 / total_devices as f64
            )
        };

        let mut error_breakdown: BTreeMap<String, ErrorBreakdownEntry> = BTreeMap::new();
        for outcome in outcomes.iter().filter(|o| !o.success) {
            if let Some(error) = &outcome.error {
                let entry = error_breakdown
                    .entry(error.clone())
                    .or_insert_with(|| ErrorBreakdownEntry {
                        count: 0,
                        endpoints: Vec::new(),
                    });
                entry.count += 1;
                entry.endpoints.push(outcome.endpoint.clone());
            }
        }

        Self {
            total_devices,
            successful_deliveries,
            failed_deliveries,
            delivery_rate,
            processing_time_ms: processing_time.as_millis() as u64,
            error_breakdown,
        }
    }
}

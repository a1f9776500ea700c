//! Inbound notification payloads and their validation.
//!
//! The trigger endpoint deserializes into [`NotificationPayload`], where
//! every field is optional, then [`NotificationPayload::validate`] either
//! produces a strongly-typed [`NotificationRequest`] or the complete list
//! of field issues. Validation never stops at the first problem, so a
//! caller sees everything wrong with a request in one response.

use serde::{Deserialize, Serialize};
use url::Url;

/// One field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Web Push urgency header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl Urgency {
    const VALUES: [(&'static str, Urgency); 4] = [
        ("very-low", Urgency::VeryLow),
        ("low", Urgency::Low),
        ("normal", Urgency::Normal),
        ("high", Urgency::High),
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::VALUES
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, urgency)| *urgency)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::VeryLow => "very-low",
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        }
    }
}

/// A notification action button shown by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Raw trigger-endpoint body. Field names follow the browser
/// Notification API, hence camelCase on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPayload {
    pub title: Option<String>,
    pub message: Option<String>,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub timestamp: Option<i64>,
    pub vibrate: Option<bool>,
    pub renotify: Option<bool>,
    pub require_interaction: Option<bool>,
    pub silent: Option<bool>,
    pub actions: Option<Vec<RawNotificationAction>>,
    pub url: Option<String>,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    pub ttl: Option<i64>,
    pub urgency: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawNotificationAction {
    pub action: Option<String>,
    pub title: Option<String>,
}

/// A fully validated notification, ready for serialization and dispatch.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    pub image: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub timestamp: Option<i64>,
    pub vibrate: Option<bool>,
    pub renotify: Option<bool>,
    pub require_interaction: Option<bool>,
    pub silent: Option<bool>,
    pub actions: Vec<NotificationAction>,
    pub url: Option<String>,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    pub ttl: Option<u32>,
    pub urgency: Option<Urgency>,
    pub topic: Option<String>,
}

impl NotificationPayload {
    /// Validate into a [`NotificationRequest`], accumulating every field
    /// issue instead of short-circuiting.
    pub fn validate(self) -> Result<NotificationRequest, Vec<FieldIssue>> {
        let mut issues = Vec::new();

        let title = required_text("title", self.title, &mut issues);
        let message = required_text("message", self.message, &mut issues);

        for (field, value) in [
            ("image", &self.image),
            ("icon", &self.icon),
            ("badge", &self.badge),
            ("url", &self.url),
        ] {
            check_absolute_url(field, value.as_deref(), &mut issues);
        }

        let ttl = match self.ttl {
            Some(ttl) if ttl < 0 => {
                issues.push(FieldIssue::new("ttl", "must be greater than or equal to 0"));
                None
            }
            Some(ttl) if ttl > u32::MAX as i64 => {
                issues.push(FieldIssue::new("ttl", "exceeds the maximum supported value"));
                None
            }
            Some(ttl) => Some(ttl as u32),
            None => None,
        };

        let urgency = match self.urgency.as_deref() {
            None => None,
            Some(raw) => match Urgency::parse(raw) {
                Some(urgency) => Some(urgency),
                None => {
                    issues.push(FieldIssue::new(
                        "urgency",
                        "must be one of: very-low, low, normal, high",
                    ));
                    None
                }
            },
        };

        let mut actions = Vec::new();
        for (index, raw) in self.actions.unwrap_or_default().into_iter().enumerate() {
            let action = required_text(format!("actions[{}].action", index), raw.action, &mut issues);
            let title = required_text(format!("actions[{}].title", index), raw.title, &mut issues);
            if let (Some(action), Some(title)) = (action, title) {
                actions.push(NotificationAction { action, title });
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(NotificationRequest {
            // Guarded by the issues check above
            title: title.expect("validated"),
            message: message.expect("validated"),
            image: self.image,
            icon: self.icon,
            badge: self.badge,
            tag: self.tag,
            timestamp: self.timestamp,
            vibrate: self.vibrate,
            renotify: self.renotify,
            require_interaction: self.require_interaction,
            silent: self.silent,
            actions,
            url: self.url,
            data: self.data,
            ttl,
            urgency,
            topic: self.topic,
        })
    }
}

fn required_text(
    field: impl Into<String>,
    value: Option<String>,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Some(text),
        Some(_) => {
            issues.push(FieldIssue::new(field, "must not be empty"));
            None
        }
        None => {
            issues.push(FieldIssue::new(field, "is required"));
            None
        }
    }
}

fn check_absolute_url(field: &str, value: Option<&str>, issues: &mut Vec<FieldIssue>) {
    if let Some(raw) = value {
        // Url::parse rejects relative references, which is exactly the contract
        if Url::parse(raw).is_err() {
            issues.push(FieldIssue::new(field, "must be a valid absolute URL"));
        }
    }
}

/// Client-facing payload projection. Absent optional fields are omitted
/// entirely, never serialized as null, to keep the encrypted payload
/// minimal.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload<'a> {
    title: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vibrate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    renotify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    require_interaction: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    silent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actions: Option<&'a [NotificationAction]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    urgency: Option<Urgency>,
}

impl NotificationRequest {
    /// Serialize the client payload once per fan-out; the dispatcher
    /// shares the returned bytes across every recipient.
    pub fn to_wire_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&WirePayload {
            title: &self.title,
            message: &self.message,
            image: self.image.as_deref(),
            icon: self.icon.as_deref(),
            badge: self.badge.as_deref(),
            tag: self.tag.as_deref(),
            timestamp: self.timestamp,
            vibrate: self.vibrate,
            renotify: self.renotify,
            require_interaction: self.require_interaction,
            silent: self.silent,
            actions: if self.actions.is_empty() {
                None
            } else {
                Some(&self.actions)
            },
            url: self.url.as_deref(),
            data: self.data.as_ref(),
            urgency: self.urgency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_payload() -> NotificationPayload {
        NotificationPayload {
            title: Some("New post".to_string()),
            message: Some("A fresh article is live".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_payload_validates() {
        let request = minimal_payload().validate().unwrap();
        assert_eq!(request.title, "New post");
        assert_eq!(request.message, "A fresh article is live");
        assert!(request.actions.is_empty());
    }

    #[test]
    fn test_missing_message_yields_single_issue() {
        let payload = NotificationPayload {
            title: Some("New post".to_string()),
            ..Default::default()
        };

        let issues = payload.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "message");
    }

    #[test]
    fn test_all_violations_reported_at_once() {
        let payload = NotificationPayload {
            title: Some("  ".to_string()),
            message: None,
            icon: Some("not a url".to_string()),
            ttl: Some(-5),
            urgency: Some("urgent".to_string()),
            ..Default::default()
        };

        let issues = payload.validate().unwrap_err();
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "message", "icon", "ttl", "urgency"]);
    }

    #[test]
    fn test_relative_url_rejected() {
        let payload = NotificationPayload {
            image: Some("/images/banner.png".to_string()),
            ..minimal_payload()
        };

        let issues = payload.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "image");
    }

    #[test]
    fn test_action_entries_validated() {
        let payload = NotificationPayload {
            actions: Some(vec![
                RawNotificationAction {
                    action: Some("open".to_string()),
                    title: Some("Open".to_string()),
                },
                RawNotificationAction {
                    action: None,
                    title: Some("Dismiss".to_string()),
                },
            ]),
            ..minimal_payload()
        };

        let issues = payload.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "actions[1].action");
    }

    #[test]
    fn test_urgency_values() {
        assert_eq!(Urgency::parse("very-low"), Some(Urgency::VeryLow));
        assert_eq!(Urgency::parse("high"), Some(Urgency::High));
        assert_eq!(Urgency::parse("critical"), None);
        assert_eq!(Urgency::High.as_str(), "high");
    }

    #[test]
    fn test_wire_payload_omits_absent_fields() {
        let request = minimal_payload().validate().unwrap();
        let bytes = request.to_wire_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["title"], "New post");
        assert!(!object.contains_key("icon"));
        assert!(!object.contains_key("ttl"));
    }

    #[test]
    fn test_wire_payload_camel_case_fields() {
        let payload = NotificationPayload {
            require_interaction: Some(true),
            urgency: Some("low".to_string()),
            ..minimal_payload()
        };
        let request = payload.validate().unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&request.to_wire_bytes().unwrap()).unwrap();

        assert_eq!(value["requireInteraction"], true);
        assert_eq!(value["urgency"], "low");
    }
}

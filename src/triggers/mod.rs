//! Inbound notification triggers.

mod http;

pub use http::{send_notification, NoSubscribersResponse, SendNotificationResponse};

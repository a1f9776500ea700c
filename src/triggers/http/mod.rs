//! HTTP trigger for notification fan-out.

mod handlers;
mod models;

pub use handlers::send_notification;
pub use models::{NoSubscribersResponse, SendNotificationResponse};

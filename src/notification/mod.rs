mod dispatcher;
mod report;
mod request;

pub use dispatcher::{
    DispatchOutcome, DispatcherStats, DispatcherStatsSnapshot, PushDispatcher,
};
pub use report::{DeliveryOutcome, DeliveryReport, ErrorBreakdownEntry};
pub use request::{
    FieldIssue, NotificationAction, NotificationPayload, NotificationRequest,
    RawNotificationAction, Urgency,
};

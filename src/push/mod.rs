//! Push transport abstraction.
//!
//! The dispatcher talks to a [`PushTransport`] and only ever sees tagged
//! [`PushOutcome`]s; provider-specific status codes stay inside the
//! `web-push` adapter.

mod transport;
mod web_push_transport;

pub use transport::{PushMessage, PushOutcome, PushTransport};
pub use web_push_transport::WebPushTransport;

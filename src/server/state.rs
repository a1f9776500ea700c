use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::notification::PushDispatcher;
use crate::push::PushTransport;
use crate::ratelimit::FixedWindowLimiter;
use crate::store::SubscriptionStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub store: Arc<dyn SubscriptionStore>,
    pub dispatcher: Arc<PushDispatcher>,
    pub rate_limiter: Arc<FixedWindowLimiter>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));
        let dispatcher = Arc::new(PushDispatcher::with_concurrency(
            store.clone(),
            transport,
            settings.push.max_concurrent_sends,
        ));
        let rate_limiter = Arc::new(FixedWindowLimiter::new(settings.ratelimit.clone()));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            store,
            dispatcher,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

//! Web Push protocol transport.
//!
//! Sends VAPID-signed, per-recipient encrypted messages through the
//! `web-push` crate. Payloads use aes128gcm content encoding against each
//! subscription's own key material.

use async_trait::async_trait;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushClient, WebPushError,
    WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

use crate::config::VapidConfig;
use crate::store::Subscription;

use super::transport::{PushMessage, PushOutcome, PushTransport};

pub struct WebPushTransport {
    client: WebPushClient,
    vapid: VapidConfig,
}

impl WebPushTransport {
    pub fn new(vapid: VapidConfig) -> Result<Self, WebPushError> {
        let client = WebPushClient::new()?;
        Ok(Self { client, vapid })
    }

    async fn send(
        &self,
        subscription: &Subscription,
        message: &PushMessage,
    ) -> Result<(), WebPushError> {
        let subscription_info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut builder = WebPushMessageBuilder::new(&subscription_info)?;
        builder.set_payload(ContentEncoding::Aes128Gcm, &message.payload);
        if let Some(ttl) = message.ttl {
            builder.set_ttl(ttl);
        }
        // TODO: set Urgency and Topic headers once web-push exposes them;
        // until then urgency rides inside the client payload only.

        let mut signature_builder = VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            URL_SAFE_NO_PAD,
            &subscription_info,
        )?;
        signature_builder.add_claim("sub", self.vapid.subject.as_str());
        builder.set_vapid_signature(signature_builder.build()?);

        self.client.send(builder.build()?).await
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(&self, subscription: &Subscription, message: &PushMessage) -> PushOutcome {
        match self.send(subscription, message).await {
            Ok(()) => PushOutcome::Delivered,
            // 404/410 from the push service: endpoint will never work again
            Err(WebPushError::EndpointNotFound) | Err(WebPushError::EndpointNotValid) => {
                PushOutcome::Gone
            }
            Err(e) => PushOutcome::Transient {
                reason: e.to_string(),
            },
        }
    }
}

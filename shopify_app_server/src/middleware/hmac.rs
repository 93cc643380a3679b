//! Webhook signature checks.
//!
//! Shopify signs every webhook delivery with the app's secret: the `X-Shopify-Hmac-Sha256` header carries the
//! base64 HMAC-SHA256 of the raw request body. [`WebhookVerifier`] is placed at the head of each webhook route's
//! handler chain, so the caller's handler only ever sees verified deliveries. The decoded delivery is stored in the
//! request extensions as a [`WebhookDelivery`].

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};
use serde_json::Value;
use shopify_tools::{helpers::verify_webhook_hmac, Secret};

use crate::{
    errors::{AuthError, ServerError},
    helpers::bytes_to_payload,
    route_table::{Next, RouteHandler},
};

pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

/// A verified webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub topic: String,
    pub shop_domain: String,
    pub payload: Value,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Secret<String>,
}

impl WebhookVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }
}

impl RouteHandler for WebhookVerifier {
    fn handle(&self, mut req: ServiceRequest, next: Next) -> LocalBoxFuture<'static, Result<ServiceResponse, Error>> {
        let secret = self.secret.clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for {}", req.path());
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook body: {:?}", e);
                ServerError::InvalidRequestBody(e.to_string())
            })?;
            let signature = header(&req, HMAC_HEADER).ok_or_else(|| {
                warn!("🔐️ No HMAC signature found in webhook request. Denying access.");
                ServerError::AuthenticationError(AuthError::MissingWebhookSignature)
            })?;
            if !verify_webhook_hmac(secret.reveal(), data.as_ref(), &signature) {
                warn!("🔐️ Invalid HMAC signature found in webhook request. Denying access.");
                return Err(ServerError::AuthenticationError(AuthError::InvalidWebhookSignature).into());
            }
            let payload = serde_json::from_slice::<Value>(&data)
                .map_err(|e| ServerError::CouldNotDeserializePayload(e.to_string()))?;
            let delivery = WebhookDelivery {
                topic: header(&req, TOPIC_HEADER).unwrap_or_default(),
                shop_domain: header(&req, SHOP_DOMAIN_HEADER).unwrap_or_default(),
                payload,
            };
            debug!("🛍️ Verified {} webhook from {}", delivery.topic, delivery.shop_domain);
            req.extensions_mut().insert(delivery);
            req.set_payload(bytes_to_payload(data));
            next.call(req).await
        })
    }
}

fn header(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

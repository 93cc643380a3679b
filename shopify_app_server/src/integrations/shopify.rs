//! The two calls the auth flow makes to Shopify, behind a trait so that the flow can run against a fake platform.

use futures::future::LocalBoxFuture;
use shopify_tools::{
    AccessTokenResponse,
    Secret,
    ShopifyApi,
    ShopifyApiError,
    WebhookRegistration,
    WebhookSubscription,
};

pub trait ShopifyGateway: Send + Sync + 'static {
    /// Trades an OAuth authorization code for an access token.
    fn exchange_token(&self, shop: String, code: String)
        -> LocalBoxFuture<'static, Result<AccessTokenResponse, ShopifyApiError>>;

    fn register_webhook(
        &self,
        registration: WebhookRegistration,
    ) -> LocalBoxFuture<'static, Result<WebhookSubscription, ShopifyApiError>>;
}

/// The real thing: talks to `https://{shop}` with the app's credentials.
#[derive(Clone)]
pub struct ShopifyPlatform {
    api: ShopifyApi,
    api_key: String,
    api_secret: Secret<String>,
}

impl ShopifyPlatform {
    pub fn new(api: ShopifyApi, api_key: String, api_secret: Secret<String>) -> Self {
        Self { api, api_key, api_secret }
    }
}

impl ShopifyGateway for ShopifyPlatform {
    fn exchange_token(
        &self,
        shop: String,
        code: String,
    ) -> LocalBoxFuture<'static, Result<AccessTokenResponse, ShopifyApiError>> {
        let platform = self.clone();
        Box::pin(async move {
            platform.api.exchange_access_token(&shop, &platform.api_key, &platform.api_secret, &code).await
        })
    }

    fn register_webhook(
        &self,
        registration: WebhookRegistration,
    ) -> LocalBoxFuture<'static, Result<WebhookSubscription, ShopifyApiError>> {
        let api = self.api.clone();
        Box::pin(async move { api.register_webhook(&registration).await })
    }
}

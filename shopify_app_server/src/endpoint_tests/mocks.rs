use futures::future::LocalBoxFuture;
use mockall::mock;
use shopify_tools::{AccessTokenResponse, ShopifyApiError, WebhookRegistration, WebhookSubscription};

use crate::integrations::shopify::ShopifyGateway;

mock! {
    pub Gateway {}
    impl ShopifyGateway for Gateway {
        fn exchange_token(&self, shop: String, code: String) -> LocalBoxFuture<'static, Result<AccessTokenResponse, ShopifyApiError>>;
        fn register_webhook(&self, registration: WebhookRegistration) -> LocalBoxFuture<'static, Result<WebhookSubscription, ShopifyApiError>>;
    }
}

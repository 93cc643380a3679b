//! # Shopify tools
//!
//! Thin client-side helpers for a Shopify embedded app:
//! * [`ShopifyApi`]: Admin REST requests, GraphQL queries, webhook registration and the OAuth token exchange.
//! * [`oauth`]: authorize-URL construction and callback HMAC checks.
//! * [`helpers`]: webhook signatures and shop-domain utilities.

mod api;
mod config;
mod data_objects;
mod error;
mod secret;

pub mod helpers;
pub mod oauth;

pub use api::{read_response, shopify_api, ShopifyApi};
pub use config::{parse_scopes, ShopifyConfig};
pub use data_objects::{
    AccessMode,
    AccessTokenResponse,
    ApiAction,
    DeliveryMethod,
    RequestOptions,
    WebhookRegistration,
    WebhookSubscription,
    WebhookTarget,
};
pub use error::ShopifyApiError;
pub use secret::Secret;

/// The Admin API version used when a caller doesn't ask for a specific one.
pub const DEFAULT_API_VERSION: &str = "2020-10";

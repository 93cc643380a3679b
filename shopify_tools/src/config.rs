use log::*;

use crate::{AccessMode, Secret, DEFAULT_API_VERSION};

/// App credentials and OAuth settings, as issued in the Shopify partner dashboard.
#[derive(Debug, Clone, Default)]
pub struct ShopifyConfig {
    pub api_key: String,
    /// Used to sign the session cookie and to check OAuth callbacks.
    pub api_secret: Secret<String>,
    /// Used to check the signature on incoming webhooks. `None` when the environment doesn't provide one.
    pub webhook_secret: Option<Secret<String>>,
    pub api_version: String,
    pub scopes: Vec<String>,
    pub access_mode: AccessMode,
}

impl ShopifyConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_key = std::env::var("SHOPIFY_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SHOPIFY_API_KEY not set. The OAuth flow will not work without it.");
            String::default()
        });
        let api_secret = Secret::new(std::env::var("SHOPIFY_API_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SHOPIFY_API_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let webhook_secret = std::env::var("SHOPIFY_API_SECRET_KEY").ok().map(Secret::new);
        if webhook_secret.is_none() {
            info!("🪛️ SHOPIFY_API_SECRET_KEY not set. Webhooks will be checked against SHOPIFY_API_SECRET instead.");
        }
        let api_version = std::env::var("SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("🪛️ SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let scopes = std::env::var("SHOPIFY_SCOPES")
            .map(|s| parse_scopes(&s))
            .unwrap_or_else(|_| {
                info!("🪛️ SHOPIFY_SCOPES not set. No access scopes will be requested.");
                Vec::new()
            });
        let access_mode = std::env::var("SHOPIFY_ACCESS_MODE")
            .ok()
            .and_then(|s| s.parse::<AccessMode>().map_err(|e| warn!("🪛️ Invalid SHOPIFY_ACCESS_MODE. {e}")).ok())
            .unwrap_or_default();
        Self { api_key, api_secret, webhook_secret, api_version, scopes, access_mode }
    }
}

pub fn parse_scopes(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

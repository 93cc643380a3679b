//! The pieces of Shopify's authorization-code grant that an app server has to do itself: building the authorize
//! redirect, producing the `state` nonce, and checking the HMAC Shopify attaches to the callback.
//!
//! The token exchange lives on [`ShopifyApi`](crate::ShopifyApi) since it is a plain HTTP call.

use std::collections::BTreeMap;

use rand::Rng;
use url::{form_urlencoded, Url};

use crate::{
    helpers::{is_valid_shop_domain, verify_hex_hmac},
    AccessMode,
    ShopifyApiError,
};

pub const AUTHORIZE_PATH: &str = "/admin/oauth/authorize";
pub const ACCESS_TOKEN_PATH: &str = "/admin/oauth/access_token";

pub fn generate_nonce() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}

pub fn authorization_url(
    shop: &str,
    api_key: &str,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
    access_mode: AccessMode,
) -> Result<String, ShopifyApiError> {
    if !is_valid_shop_domain(shop) {
        return Err(ShopifyApiError::InvalidShopDomain(shop.to_string()));
    }
    let scope = scopes.join(",");
    let mut params = vec![
        ("client_id", api_key),
        ("scope", scope.as_str()),
        ("redirect_uri", redirect_uri),
        ("state", state),
    ];
    if access_mode == AccessMode::Online {
        params.push(("grant_options[]", "per-user"));
    }
    let url = Url::parse_with_params(&format!("https://{shop}{AUTHORIZE_PATH}"), &params)
        .map_err(|e| ShopifyApiError::RestRequestError(e.to_string()))?;
    Ok(url.to_string())
}

/// Validates the `hmac` query parameter of an OAuth callback. Every other parameter except `signature` is signed,
/// sorted by key and re-encoded as an `application/x-www-form-urlencoded` query string.
pub fn validate_callback_hmac(params: &BTreeMap<String, String>, secret: &str) -> bool {
    let Some(hmac) = params.get("hmac") else {
        return false;
    };
    let message = signed_message(params);
    verify_hex_hmac(secret, message.as_bytes(), hmac)
}

fn signed_message(params: &BTreeMap<String, String>) -> String {
    let mut message = form_urlencoded::Serializer::new(String::new());
    params.iter().filter(|(k, _)| k.as_str() != "hmac" && k.as_str() != "signature").for_each(|(k, v)| {
        message.append_pair(k, v);
    });
    message.finish()
}

use hmac::{Hmac, Mac};
use log::warn;
use regex::Regex;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SHOP_DOMAIN_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9\-]*\.myshopify\.com$";

/// The subdomain part of a shop domain, i.e. everything before the first `.`.
///
/// `shop_id("foo.myshopify.com") == "foo"`. A value without a dot is returned unchanged.
pub fn shop_id(shop: &str) -> &str {
    shop.split('.').next().unwrap_or(shop)
}

/// True if `shop` looks like `{subdomain}.myshopify.com`. Anything else is refused before we redirect a browser to
/// it or send it an access token.
pub fn is_valid_shop_domain(shop: &str) -> bool {
    Regex::new(SHOP_DOMAIN_PATTERN).map(|re| re.is_match(shop)).unwrap_or_else(|e| {
        warn!("🛍️ Shop domain pattern failed to compile. {e}");
        false
    })
}

fn hmac_sha256(secret: &str, data: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take a key of any size");
    mac.update(data);
    mac
}

/// Base64-encoded HMAC-SHA256 of `data`, as Shopify sends it in `X-Shopify-Hmac-Sha256`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    base64::encode(hmac_sha256(secret, data).finalize().into_bytes())
}

/// Checks a base64 webhook signature in constant time.
pub fn verify_webhook_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    match base64::decode(signature.trim()) {
        Ok(expected) => hmac_sha256(secret, data).verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

/// Checks a hex-encoded HMAC, the format used to sign OAuth redirects.
pub fn verify_hex_hmac(secret: &str, data: &[u8], signature: &str) -> bool {
    match hex::decode(signature.trim()) {
        Ok(expected) => hmac_sha256(secret, data).verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

pub fn calculate_hex_hmac(secret: &str, data: &[u8]) -> String {
    hex::encode(hmac_sha256(secret, data).finalize().into_bytes())
}

//! What the auth flow keeps in the cookie session, and typed access to it.

use actix_session::Session;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

pub const SESSION_SHOP: &str = "shop";
pub const SESSION_ACCESS_TOKEN: &str = "accessToken";
pub const SESSION_SHOP_ID: &str = "shopID";
pub const SESSION_OAUTH_STATE: &str = "shopifyNonce";

/// The shop a browser session is logged into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopSession {
    pub shop: String,
    pub access_token: String,
    pub shop_id: String,
}

impl ShopSession {
    /// Reads the logged-in shop, if both the shop and its access token are present.
    pub fn load(session: &Session) -> Result<Option<Self>, ServerError> {
        let shop = get::<String>(session, SESSION_SHOP)?;
        let access_token = get::<String>(session, SESSION_ACCESS_TOKEN)?;
        let (Some(shop), Some(access_token)) = (shop, access_token) else {
            return Ok(None);
        };
        let shop_id = match get::<String>(session, SESSION_SHOP_ID)? {
            Some(id) => id,
            None => shopify_tools::helpers::shop_id(&shop).to_string(),
        };
        Ok(Some(Self { shop, access_token, shop_id }))
    }

    pub fn store(&self, session: &Session) -> Result<(), ServerError> {
        insert(session, SESSION_SHOP, &self.shop)?;
        insert(session, SESSION_ACCESS_TOKEN, &self.access_token)?;
        insert(session, SESSION_SHOP_ID, &self.shop_id)
    }
}

pub fn get<T: serde::de::DeserializeOwned>(session: &Session, key: &str) -> Result<Option<T>, ServerError> {
    session.get::<T>(key).map_err(|e| ServerError::SessionError(e.to_string()))
}

pub fn insert<T: Serialize>(session: &Session, key: &str, value: &T) -> Result<(), ServerError> {
    session.insert(key, value).map_err(|e| ServerError::SessionError(e.to_string()))
}

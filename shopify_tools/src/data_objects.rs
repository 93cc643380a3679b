use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DEFAULT_API_VERSION;

//----------------------------------------------   AccessMode  ---------------------------------------------------------

/// Which kind of access token the OAuth flow asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Token bound to the logged-in staff member and the browser session.
    #[default]
    Online,
    /// Long-lived, app-wide token.
    Offline,
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => Err(format!("'{other}' is not an access mode. Use 'online' or 'offline'")),
        }
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

//----------------------------------------------   Webhooks  -----------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMethod {
    #[default]
    Http,
    EventBridge,
}

/// A webhook the app wants Shopify to deliver once a shop has installed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    /// The callback URL (or EventBridge ARN) Shopify delivers to.
    pub address: String,
    /// GraphQL topic enum value, e.g. `PRODUCTS_CREATE`.
    pub topic: String,
}

impl WebhookTarget {
    pub fn new<A: Into<String>, T: Into<String>>(address: A, topic: T) -> Self {
        Self { address: address.into(), topic: topic.into() }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookRegistration {
    pub address: String,
    pub topic: String,
    pub access_token: String,
    pub shop: String,
    pub api_version: String,
    pub delivery_method: DeliveryMethod,
}

impl WebhookRegistration {
    pub fn new(target: &WebhookTarget, shop: &str, access_token: &str, api_version: &str) -> Self {
        Self {
            address: target.address.clone(),
            topic: target.topic.clone(),
            access_token: access_token.to_string(),
            shop: shop.to_string(),
            api_version: api_version.to_string(),
            delivery_method: DeliveryMethod::Http,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: String,
}

//----------------------------------------------   OAuth  --------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    /// Only present for online tokens.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub associated_user_scope: Option<String>,
    #[serde(default)]
    pub associated_user: Option<Value>,
}

//----------------------------------------------   REST requests  ------------------------------------------------------

/// The path of an Admin REST resource, as one or more segments. `["orders", "123", "transactions"]` addresses
/// `orders/123/transactions.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAction(Vec<String>);

impl ApiAction {
    pub fn path(&self) -> String {
        self.0.join("/")
    }
}

impl From<&str> for ApiAction {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for ApiAction {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<&[&str]> for ApiAction {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ApiAction {
    fn from(value: [&str; N]) -> Self {
        Self(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for ApiAction {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Sent as the JSON body for anything but GET.
    pub data: Value,
    pub query_params: Option<BTreeMap<String, String>>,
    pub api_version: String,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            data: Value::Object(Default::default()),
            query_params: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(method: Method, data: Value) -> Self {
        Self { method, data, ..Default::default() }
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query_params.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    pub fn api_version<S: Into<String>>(mut self, version: S) -> Self {
        self.api_version = version.into();
        self
    }
}

use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{header::CONTENT_TYPE, Client, Method, Request, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    data_objects::{AccessTokenResponse, ApiAction, DeliveryMethod, RequestOptions, WebhookRegistration},
    helpers::is_valid_shop_domain,
    oauth::ACCESS_TOKEN_PATH,
    Secret,
    ShopifyApiError,
    WebhookSubscription,
};

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const HTTP_WEBHOOK_MUTATION: &str = r#"
mutation webhookSubscriptionCreate($topic: WebhookSubscriptionTopic!, $webhookSubscription: WebhookSubscriptionInput!) {
  webhookSubscriptionCreate(topic: $topic, webhookSubscription: $webhookSubscription) {
    userErrors { field message }
    webhookSubscription { id }
  }
}"#;

const EVENT_BRIDGE_WEBHOOK_MUTATION: &str = r#"
mutation eventBridgeWebhookSubscriptionCreate($topic: WebhookSubscriptionTopic!, $webhookSubscription: EventBridgeWebhookSubscriptionInput!) {
  eventBridgeWebhookSubscriptionCreate(topic: $topic, webhookSubscription: $webhookSubscription) {
    userErrors { field message }
    webhookSubscription { id }
  }
}"#;

/// Client for the Admin API of any shop. Access tokens are passed per call, since an app server talks to every shop
/// that installed it.
#[derive(Clone)]
pub struct ShopifyApi {
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new() -> Result<Self, ShopifyApiError> {
        let client = Client::builder().build().map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client: Arc::new(client) }
    }

    pub fn url(shop: &str, api_version: &str, action: &ApiAction) -> String {
        format!("https://{shop}/admin/api/{api_version}/{}.json", action.path())
    }

    /// Builds, but does not send, an Admin REST request. GET requests never carry a body.
    pub fn build_request(
        &self,
        access_token: &str,
        shop: &str,
        action: &ApiAction,
        opts: &RequestOptions,
    ) -> Result<Request, ShopifyApiError> {
        let url = Self::url(shop, &opts.api_version, action);
        trace!("Building {} request for {url}", opts.method);
        let mut req = self
            .client
            .request(opts.method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCESS_TOKEN_HEADER, access_token);
        if let Some(params) = &opts.query_params {
            req = req.query(params);
        }
        if opts.method != Method::GET {
            req = req.json(&opts.data);
        }
        req.build().map_err(|e| ShopifyApiError::RestRequestError(e.to_string()))
    }

    /// Calls `https://{shop}/admin/api/{version}/{action}.json` and returns the decoded JSON body.
    ///
    /// Any non-2xx answer is logged and returned as [`ShopifyApiError::HttpFailure`] with the status and the
    /// (JSON-decoded, where possible) body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        access_token: &str,
        shop: &str,
        action: impl Into<ApiAction>,
        opts: RequestOptions,
    ) -> Result<T, ShopifyApiError> {
        let action = action.into();
        let req = self.build_request(access_token, shop, &action, &opts)?;
        debug!("🛍️ {} {}", req.method(), req.url());
        let response = self.client.execute(req).await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
        read_response(response).await
    }

    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        access_token: &str,
        shop: &str,
        api_version: &str,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        trace!("Sending GraphQL query: {body}");
        let opts = RequestOptions::with_method(Method::POST, body).api_version(api_version);
        let result = self.request::<Value>(access_token, shop, "graphql", opts).await?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        trace!("GraphQL response: {data}");
        trace!("GraphQL costs: {}", result["extensions"]["cost"]);
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))
    }

    pub async fn register_webhook(
        &self,
        registration: &WebhookRegistration,
    ) -> Result<WebhookSubscription, ShopifyApiError> {
        let (mutation, field, subscription) = match registration.delivery_method {
            DeliveryMethod::Http => (
                HTTP_WEBHOOK_MUTATION,
                "webhookSubscriptionCreate",
                json!({ "callbackUrl": registration.address, "format": "JSON" }),
            ),
            DeliveryMethod::EventBridge => (
                EVENT_BRIDGE_WEBHOOK_MUTATION,
                "eventBridgeWebhookSubscriptionCreate",
                json!({ "arn": registration.address, "format": "JSON" }),
            ),
        };
        let variables = json!({ "topic": registration.topic, "webhookSubscription": subscription });
        debug!("🛍️ Registering {} webhook for {}", registration.topic, registration.shop);
        let response = self
            .graphql_query::<Value>(
                &registration.access_token,
                &registration.shop,
                &registration.api_version,
                mutation,
                Some(variables),
            )
            .await?;
        if let Some(errors) = response[field]["userErrors"].as_array() {
            if !errors.is_empty() {
                let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
                return Err(ShopifyApiError::GraphQLError(e));
            }
        }
        let subscription = serde_json::from_value::<WebhookSubscription>(response[field]["webhookSubscription"].clone())
            .map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
        info!("🛍️ Registered {} webhook for {}: {}", registration.topic, registration.shop, subscription.id);
        Ok(subscription)
    }

    /// Trades the authorization `code` from an OAuth callback for an access token.
    pub async fn exchange_access_token(
        &self,
        shop: &str,
        api_key: &str,
        api_secret: &Secret<String>,
        code: &str,
    ) -> Result<AccessTokenResponse, ShopifyApiError> {
        if !is_valid_shop_domain(shop) {
            return Err(ShopifyApiError::InvalidShopDomain(shop.to_string()));
        }
        let url = format!("https://{shop}{ACCESS_TOKEN_PATH}");
        let body = json!({
            "client_id": api_key,
            "client_secret": api_secret.reveal(),
            "code": code,
        });
        debug!("🔐️ Requesting access token from {shop}");
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
        read_response(response).await
    }
}

/// Decodes a JSON body on success. Otherwise the body is decoded as JSON if possible (or kept as a JSON string),
/// logged, and returned in [`ShopifyApiError::HttpFailure`].
pub async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, ShopifyApiError> {
    let status = response.status();
    if status.is_success() {
        trace!("REST query successful. {status}");
        return response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()));
    }
    let text = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    error!("🛍️ Shopify request failed with status {status}. {body}");
    Err(ShopifyApiError::HttpFailure { status: status.as_u16(), body })
}

/// One-shot form of [`ShopifyApi::request`] for callers that don't keep a client around.
pub async fn shopify_api<T: DeserializeOwned>(
    access_token: &str,
    shop: &str,
    action: impl Into<ApiAction>,
    opts: RequestOptions,
) -> Result<T, ShopifyApiError> {
    ShopifyApi::new()?.request(access_token, shop, action, opts).await
}

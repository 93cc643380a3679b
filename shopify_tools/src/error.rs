use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Shopify request failed with status {status}. {body}")]
    HttpFailure { status: u16, body: Value },
    #[error("Invalid GraphQL query: {0}")]
    InvalidGraphQL(String),
    #[error("GraphQL query failed: {0}")]
    GraphQLError(String),
    #[error("The response from Shopify was empty")]
    EmptyResponse,
    #[error("'{0}' is not a valid myshopify.com domain")]
    InvalidShopDomain(String),
}

impl ShopifyApiError {
    /// The HTTP status Shopify answered with, if the call got as far as a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use shopify_tools::ShopifyApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Payload deserialization error. {0}")]
    CouldNotDeserializePayload(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Shopify API error. {0}")]
    ShopifyError(#[from] ShopifyApiError),
    #[error("Could not access the session. {0}")]
    SessionError(String),
    #[error("The after-auth hook failed. {0}")]
    HookError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingShop => StatusCode::BAD_REQUEST,
                AuthError::InvalidShop(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidState => StatusCode::FORBIDDEN,
                AuthError::InvalidHmac => StatusCode::BAD_REQUEST,
                AuthError::MissingCode => StatusCode::BAD_REQUEST,
                AuthError::TokenExchange(_) => StatusCode::BAD_GATEWAY,
                AuthError::MissingWebhookSignature => StatusCode::UNAUTHORIZED,
                AuthError::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            },
            Self::ShopifyError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SessionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::HookError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Expected a valid shop query parameter.")]
    MissingShop,
    #[error("{0} is not a valid myshopify.com domain.")]
    InvalidShop(String),
    #[error("Request origin could not be verified. OAuth state does not match.")]
    InvalidState,
    #[error("Request origin could not be verified. Invalid HMAC.")]
    InvalidHmac,
    #[error("Expected an authorization code in the OAuth callback.")]
    MissingCode,
    #[error("Could not obtain an access token. {0}")]
    TokenExchange(String),
    #[error("No webhook signature found.")]
    MissingWebhookSignature,
    #[error("Invalid webhook signature.")]
    InvalidWebhookSignature,
}

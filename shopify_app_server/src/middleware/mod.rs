mod hmac;
mod static_files;
mod validation;

pub use hmac::{WebhookDelivery, WebhookVerifier, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER};
pub use static_files::{resolve_static_file, StaticFiles, StaticFilesService, StaticPath};
pub use validation::{
    BypassPolicy,
    RequestValidator,
    Validation,
    ValidationGate,
    ValidationGateService,
    ADMIN_API_PREFIX,
    PUBLIC_API_PREFIX,
};

use std::{future::Future, path::PathBuf, sync::Arc};

use futures::future::LocalBoxFuture;
use shopify_tools::{AccessMode, Secret, WebhookTarget, DEFAULT_API_VERSION};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::StaticPath,
    route_table::{HandlerChain, RouteHandler, RouteTable},
};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_STATIC_ROOT: &str = "admin/public";

/// What a successful OAuth handshake hands to the after-auth hook.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub shop: String,
    pub access_token: Secret<String>,
    /// The shop's subdomain, e.g. `foo` for `foo.myshopify.com`.
    pub shop_id: String,
    /// Scopes actually granted, comma separated.
    pub scope: String,
}

pub type AfterAuthHook = Arc<dyn Fn(AuthContext) -> LocalBoxFuture<'static, Result<(), ServerError>> + Send + Sync>;

/// Wraps an async closure as an [`AfterAuthHook`].
pub fn after_auth_hook<F, Fut>(f: F) -> AfterAuthHook
where
    F: Fn(AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServerError>> + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Routes for one router, plus an optional handler that runs in front of all of them.
#[derive(Clone, Default)]
pub struct RouteGroup {
    pub routes: RouteTable,
    pub middleware: Option<Arc<dyn RouteHandler>>,
}

impl RouteGroup {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes, middleware: None }
    }

    pub fn with_middleware<H: RouteHandler>(mut self, middleware: H) -> Self {
        self.middleware = Some(Arc::new(middleware));
        self
    }
}

#[derive(Clone, Default)]
pub struct AppRoutes {
    /// Mounted under `/api`. Reachable without a session.
    pub api: RouteGroup,
    /// Mounted under `/api/admin`. Needs a logged-in shop.
    pub admin: RouteGroup,
    /// Webhook receivers: path under `/api` → handlers. Each gets a signature check in front and answers POST only.
    pub webhooks: Vec<(String, HandlerChain)>,
}

impl AppRoutes {
    pub fn webhook(mut self, path: &str, handlers: HandlerChain) -> Self {
        self.webhooks.push((path.to_string(), handlers));
        self
    }
}

#[derive(Clone)]
pub struct AppSettings {
    pub api_key: String,
    /// The app's API secret. Signs the session cookie and validates OAuth callbacks.
    pub secret: Secret<String>,
    /// Name of the session cookie.
    pub session_key: String,
    pub api_version: String,
    pub routes: AppRoutes,
    pub scopes: Vec<String>,
    /// Registered for every shop right after it authenticates.
    pub webhooks: Vec<WebhookTarget>,
    pub access_mode: AccessMode,
    /// Request logging. `None` logs in debug builds only.
    pub logger: Option<bool>,
    pub static_path: Option<StaticPath>,
    pub static_root: PathBuf,
    /// Checks incoming webhook signatures. When `None`, `SHOPIFY_API_SECRET_KEY` is read from the environment as the
    /// app is assembled.
    pub webhook_secret: Option<Secret<String>>,
    pub bind_address: String,
    pub after_auth: AfterAuthHook,
}

impl AppSettings {
    pub fn new(api_key: &str, secret: Secret<String>, session_key: &str, after_auth: AfterAuthHook) -> Self {
        Self {
            api_key: api_key.to_string(),
            secret,
            session_key: session_key.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            routes: AppRoutes::default(),
            scopes: Vec::new(),
            webhooks: Vec::new(),
            access_mode: AccessMode::default(),
            logger: None,
            static_path: None,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
            webhook_secret: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            after_auth,
        }
    }

    /// Webhook subscriptions are not part of the environment; push them onto `webhooks` afterwards.
    pub fn from_config(config: &ServerConfig, routes: AppRoutes, after_auth: AfterAuthHook) -> Self {
        let shopify = &config.shopify;
        Self {
            api_key: shopify.api_key.clone(),
            secret: shopify.api_secret.clone(),
            session_key: config.session_key.clone(),
            api_version: shopify.api_version.clone(),
            routes,
            scopes: shopify.scopes.clone(),
            webhooks: Vec::new(),
            access_mode: shopify.access_mode,
            logger: config.logger,
            static_path: config.static_path.clone().map(StaticPath::Prefix),
            static_root: config.static_root.clone(),
            webhook_secret: shopify.webhook_secret.clone(),
            bind_address: config.host.clone(),
            after_auth,
        }
    }

    pub fn logger_enabled(&self) -> bool {
        self.logger.unwrap_or(cfg!(debug_assertions))
    }
}

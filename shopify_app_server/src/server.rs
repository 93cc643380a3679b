//! Assembles the app.
//!
//! The middleware pipeline, from the outside in:
//!
//! 1. access log (optional)
//! 2. `X-Frame-Options: ALLOWALL`, so the app can be framed by the Shopify admin
//! 3. CORS, reflecting the caller's origin
//! 4. static files
//! 5. cookie session
//! 6. OAuth (`/auth`, `/auth/callback`) behind the bypass gate
//! 7. session check behind the bypass gate
//! 8. the admin router (`/api/admin`), then the API router (`/api`), both accepting JSON bodies whatever the
//!    content type
//!
//! actix applies `wrap` calls inside out, which is why [`ShopifyApp::build`] lists them in reverse.

use std::{env, sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    body::MessageBody,
    cookie::{Key, SameSite},
    dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse},
    http::KeepAlive,
    middleware::{Condition, DefaultHeaders, Logger},
    web,
    App,
    Error,
    HttpServer,
};
use log::*;
use sha2::{Digest, Sha512};
use shopify_tools::{Secret, ShopifyApi};

use crate::{
    auth::{ShopifyAuth, VerifyRequest},
    errors::ServerError,
    integrations::shopify::{ShopifyGateway, ShopifyPlatform},
    middleware::{BypassPolicy, StaticFiles, ValidationGate, WebhookVerifier, ADMIN_API_PREFIX, PUBLIC_API_PREFIX},
    route_table::RouteHandler,
    routes::{bind_routes, RouteRegistry},
    settings::AppSettings,
};

pub const ACCESS_LOG_TARGET: &str = "shopify_app::access_log";

/// Shared state for route handlers, available as `web::Data<AppContext>`.
pub struct AppContext {
    pub api: ShopifyApi,
    pub api_key: String,
    pub api_version: String,
}

#[derive(Clone)]
pub struct ShopifyApp {
    settings: AppSettings,
    api: RouteRegistry,
    admin: RouteRegistry,
    client: ShopifyApi,
    gateway: Arc<dyn ShopifyGateway>,
}

impl ShopifyApp {
    /// Binds both route tables. Unsupported methods in either table are reported here, before anything listens.
    pub fn new(settings: AppSettings) -> Result<Self, ServerError> {
        let client = ShopifyApi::new()?;
        let gateway = Arc::new(ShopifyPlatform::new(client.clone(), settings.api_key.clone(), settings.secret.clone()));

        let verifier: Arc<dyn RouteHandler> = Arc::new(WebhookVerifier::new(webhook_secret(&settings)));
        let mut api_routes = settings.routes.api.routes.clone();
        for (path, handlers) in &settings.routes.webhooks {
            api_routes.insert("post", path, handlers.prepend(Arc::clone(&verifier)));
        }
        let mut api = RouteRegistry::new(PUBLIC_API_PREFIX).with_middleware(settings.routes.api.middleware.clone());
        bind_routes(&mut api, &api_routes)?;

        let mut admin =
            RouteRegistry::new(ADMIN_API_PREFIX).with_middleware(settings.routes.admin.middleware.clone());
        bind_routes(&mut admin, &settings.routes.admin.routes)?;

        info!(
            "🪛️ {} api routes and {} admin routes registered",
            api.bindings().len(),
            admin.bindings().len()
        );
        Ok(Self { settings, api, admin, client, gateway })
    }

    /// Replaces the client used for the token exchange and webhook registration.
    pub fn with_gateway(mut self, gateway: Arc<dyn ShopifyGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn build(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        let settings = &self.settings;
        let context = web::Data::new(AppContext {
            api: self.client.clone(),
            api_key: settings.api_key.clone(),
            api_version: settings.api_version.clone(),
        });
        let json_config = web::JsonConfig::default().content_type_required(false).content_type(|_| true);
        let session = SessionMiddleware::builder(CookieSessionStore::default(), session_signing_key(&settings.secret))
            .cookie_name(settings.session_key.clone())
            .cookie_same_site(SameSite::None)
            .cookie_secure(true)
            .build();
        let cors = Cors::default()
            .allowed_origin_fn(|_origin, _head| true)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        let logger = Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target(ACCESS_LOG_TARGET);
        let shopify_auth = ShopifyAuth::new(settings, Arc::clone(&self.gateway));
        App::new()
            .wrap(ValidationGate::new(BypassPolicy::default(), VerifyRequest))
            .wrap(ValidationGate::new(BypassPolicy::default(), shopify_auth))
            .wrap(session)
            .wrap(StaticFiles::new(settings.static_path.clone(), settings.static_root.clone()))
            .wrap(cors)
            .wrap(DefaultHeaders::new().add(("X-Frame-Options", "ALLOWALL")))
            .wrap(Condition::new(settings.logger_enabled(), logger))
            .app_data(context)
            .service(self.admin.scope().app_data(json_config.clone()))
            .service(self.api.scope().app_data(json_config))
    }

    pub fn create_server_instance(&self, port: u16) -> Result<Server, ServerError> {
        let app = self.clone();
        let srv = HttpServer::new(move || app.build())
            .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
            .bind((self.settings.bind_address.as_str(), port))?
            .run();
        Ok(srv)
    }

    /// Serves the app on `bind_address:port` until the server is stopped.
    pub async fn listen(&self, port: u16) -> Result<(), ServerError> {
        let srv = self.create_server_instance(port)?;
        info!("🚀️ Listening on :{port}");
        srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
    }
}

/// Cookie signing needs a 64-byte key, whatever the length of the app secret.
pub fn session_signing_key(secret: &Secret<String>) -> Key {
    let digest = Sha512::digest(secret.reveal().as_bytes());
    Key::from(digest.as_slice())
}

fn webhook_secret(settings: &AppSettings) -> Secret<String> {
    if let Some(secret) = &settings.webhook_secret {
        return secret.clone();
    }
    match env::var("SHOPIFY_API_SECRET_KEY") {
        Ok(s) if !s.is_empty() => Secret::new(s),
        _ => {
            warn!("🪛️ SHOPIFY_API_SECRET_KEY is not set. Webhook signatures are checked against the app secret.");
            settings.secret.clone()
        },
    }
}

//! The Shopify OAuth flow and the session check for everything behind it.
//!
//! Both are [`RequestValidator`]s, meant to sit behind a [`ValidationGate`](crate::middleware::ValidationGate) so
//! that the public API never sees them.
//!
//! * [`ShopifyAuth`] answers `/auth` (redirect to the authorize page) and `/auth/callback` (token exchange, session
//!   set-up and [`complete_auth`]). Other requests pass through untouched.
//! * [`VerifyRequest`] lets a request through only if its session belongs to a logged-in shop, and otherwise sends
//!   the browser back to `/auth`.

use std::{collections::BTreeMap, sync::Arc};

use actix_session::SessionExt;
use actix_web::{
    dev::ServiceRequest,
    http::header::LOCATION,
    web,
    Error,
    HttpResponse,
};
use futures::future::{join, join_all, LocalBoxFuture};
use log::*;
use shopify_tools::{
    helpers::{is_valid_shop_domain, shop_id},
    oauth::{authorization_url, generate_nonce, validate_callback_hmac},
    AccessMode,
    Secret,
    WebhookRegistration,
    WebhookTarget,
};

use crate::{
    errors::{AuthError, ServerError},
    integrations::shopify::ShopifyGateway,
    middleware::{RequestValidator, Validation},
    session::{self, ShopSession, SESSION_OAUTH_STATE},
    settings::{AfterAuthHook, AppSettings, AuthContext},
};

pub const AUTH_PATH: &str = "/auth";
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

/// A webhook that could not be registered for a shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookFailure {
    pub topic: String,
    pub reason: String,
}

/// How the post-auth fan-out went. Webhook failures never fail the login, they are only reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthOutcome {
    pub registered_webhooks: usize,
    /// One entry per failed registration, in the order the webhooks were configured.
    pub failures: Vec<WebhookFailure>,
}

impl AuthOutcome {
    pub fn failed_webhooks(&self) -> usize {
        self.failures.len()
    }
}

/// Runs the caller's after-auth hook and registers every webhook for the shop, all at the same time, and waits for
/// all of them. Each failed registration is logged on its own.
pub async fn complete_auth(
    gateway: Arc<dyn ShopifyGateway>,
    hook: AfterAuthHook,
    webhooks: &[WebhookTarget],
    api_version: &str,
    ctx: AuthContext,
) -> Result<AuthOutcome, ServerError> {
    let registrations = webhooks
        .iter()
        .map(|target| {
            let registration = WebhookRegistration::new(target, &ctx.shop, ctx.access_token.reveal(), api_version);
            let gateway = Arc::clone(&gateway);
            async move {
                let topic = registration.topic.clone();
                match gateway.register_webhook(registration).await {
                    Ok(sub) => {
                        debug!("🛍️ Registered {topic} webhook ({})", sub.id);
                        Ok(())
                    },
                    Err(e) => Err(WebhookFailure { topic, reason: e.to_string() }),
                }
            }
        })
        .collect::<Vec<_>>();
    let shop = ctx.shop.clone();
    let (hook_result, results) = join(hook(ctx), join_all(registrations)).await;
    let total = results.len();
    let failures = results.into_iter().filter_map(Result::err).collect::<Vec<_>>();
    for failure in &failures {
        error!("🛍️ Could not register {} webhook for {shop}. {}", failure.topic, failure.reason);
    }
    let outcome = AuthOutcome { registered_webhooks: total - failures.len(), failures };
    if outcome.failed_webhooks() > 0 {
        warn!("🛍️ {} of {total} webhooks could not be registered for {shop}", outcome.failed_webhooks());
    }
    hook_result.map_err(|e| {
        error!("🔐️ The after-auth hook failed for {shop}. {e}");
        match e {
            ServerError::HookError(_) => e,
            other => ServerError::HookError(other.to_string()),
        }
    })?;
    Ok(outcome)
}

//--------------------------------------------   ShopifyAuth  ----------------------------------------------------------

struct OAuthSettings {
    api_key: String,
    secret: Secret<String>,
    scopes: Vec<String>,
    access_mode: AccessMode,
    api_version: String,
    webhooks: Vec<WebhookTarget>,
    after_auth: AfterAuthHook,
}

#[derive(Clone)]
pub struct ShopifyAuth {
    settings: Arc<OAuthSettings>,
    gateway: Arc<dyn ShopifyGateway>,
}

impl ShopifyAuth {
    pub fn new(settings: &AppSettings, gateway: Arc<dyn ShopifyGateway>) -> Self {
        let settings = OAuthSettings {
            api_key: settings.api_key.clone(),
            secret: settings.secret.clone(),
            scopes: settings.scopes.clone(),
            access_mode: settings.access_mode,
            api_version: settings.api_version.clone(),
            webhooks: settings.webhooks.clone(),
            after_auth: Arc::clone(&settings.after_auth),
        };
        Self { settings: Arc::new(settings), gateway }
    }

    fn begin(&self, req: &ServiceRequest) -> Result<HttpResponse, ServerError> {
        let params = query_params(req)?;
        let shop = params.get("shop").ok_or(AuthError::MissingShop)?;
        if !is_valid_shop_domain(shop) {
            return Err(AuthError::InvalidShop(shop.clone()).into());
        }
        let state = generate_nonce();
        session::insert(&req.get_session(), SESSION_OAUTH_STATE, &state)?;
        let redirect_uri = format!("https://{}{AUTH_CALLBACK_PATH}", req.connection_info().host());
        let s = &self.settings;
        let url = authorization_url(shop, &s.api_key, &s.scopes, &redirect_uri, &state, s.access_mode)
            .map_err(|e| AuthError::InvalidShop(e.to_string()))?;
        info!("🔐️ Starting OAuth for {shop}");
        Ok(redirect(&url))
    }

    async fn callback(
        settings: Arc<OAuthSettings>,
        gateway: Arc<dyn ShopifyGateway>,
        req: &ServiceRequest,
    ) -> Result<HttpResponse, ServerError> {
        let params = query_params(req)?;
        let session = req.get_session();
        let expected_state = session::get::<String>(&session, SESSION_OAUTH_STATE)?;
        match (expected_state, params.get("state")) {
            (Some(expected), Some(state)) if expected == *state => {},
            _ => {
                warn!("🔐️ OAuth callback state does not match the session. Denying access.");
                return Err(AuthError::InvalidState.into());
            },
        }
        if !validate_callback_hmac(&params, settings.secret.reveal()) {
            warn!("🔐️ OAuth callback has an invalid HMAC. Denying access.");
            return Err(AuthError::InvalidHmac.into());
        }
        let shop = params.get("shop").ok_or(AuthError::MissingShop)?.clone();
        if !is_valid_shop_domain(&shop) {
            return Err(AuthError::InvalidShop(shop).into());
        }
        let code = params.get("code").cloned().ok_or(AuthError::MissingCode)?;
        let token = gateway.exchange_token(shop.clone(), code).await.map_err(|e| {
            error!("🔐️ Access token exchange failed for {shop}. {e}");
            AuthError::TokenExchange(e.to_string())
        })?;
        session.remove(SESSION_OAUTH_STATE);
        let shop_session = ShopSession {
            shop: shop.clone(),
            access_token: token.access_token.clone(),
            shop_id: shop_id(&shop).to_string(),
        };
        shop_session.store(&session)?;
        info!("🔐️ {shop} authenticated");
        let ctx = AuthContext {
            shop: shop.clone(),
            access_token: Secret::new(token.access_token),
            shop_id: shop_session.shop_id,
            scope: token.scope,
        };
        let hook = Arc::clone(&settings.after_auth);
        complete_auth(gateway, hook, &settings.webhooks, &settings.api_version, ctx).await?;
        Ok(redirect(&format!("/?shop={shop}")))
    }
}

impl RequestValidator for ShopifyAuth {
    fn validate(&self, req: ServiceRequest) -> LocalBoxFuture<'static, Result<Validation, Error>> {
        match req.path() {
            AUTH_PATH => {
                let res = self.begin(&req);
                Box::pin(async move { Ok(respond(req, res)) })
            },
            AUTH_CALLBACK_PATH => {
                let settings = Arc::clone(&self.settings);
                let gateway = Arc::clone(&self.gateway);
                Box::pin(async move {
                    let res = Self::callback(settings, gateway, &req).await;
                    Ok(respond(req, res))
                })
            },
            _ => Box::pin(async move { Ok(Validation::Continue(req)) }),
        }
    }
}

//--------------------------------------------   VerifyRequest  --------------------------------------------------------

/// Sends requests without a logged-in shop back through OAuth.
#[derive(Clone, Copy, Debug, Default)]
pub struct VerifyRequest;

impl RequestValidator for VerifyRequest {
    fn validate(&self, req: ServiceRequest) -> LocalBoxFuture<'static, Result<Validation, Error>> {
        Box::pin(async move {
            let validation = match ShopSession::load(&req.get_session()) {
                Ok(Some(session)) => {
                    trace!("🔐️ {} has a session for {}", req.path(), session.shop);
                    Validation::Continue(req)
                },
                Ok(None) => {
                    let location = login_redirect(&req);
                    debug!("🔐️ No session for {}. Redirecting to {location}", req.path());
                    Validation::Respond(req.into_response(redirect(&location)))
                },
                Err(e) => respond(req, Err(e)),
            };
            Ok(validation)
        })
    }
}

/// `/auth?shop=...` when the request names a (valid) shop, otherwise plain `/auth`.
pub fn login_redirect(req: &ServiceRequest) -> String {
    let shop = query_params(req).ok().and_then(|p| p.get("shop").cloned());
    match shop {
        Some(shop) if is_valid_shop_domain(&shop) => format!("{AUTH_PATH}?shop={shop}"),
        _ => AUTH_PATH.to_string(),
    }
}

fn query_params(req: &ServiceRequest) -> Result<BTreeMap<String, String>, ServerError> {
    web::Query::<BTreeMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().insert_header((LOCATION, location)).finish()
}

fn respond(req: ServiceRequest, res: Result<HttpResponse, ServerError>) -> Validation {
    match res {
        Ok(res) => Validation::Respond(req.into_response(res)),
        Err(e) => Validation::Respond(req.error_response(e)),
    }
}

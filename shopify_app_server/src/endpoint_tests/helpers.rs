use actix_session::SessionExt;
use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{ServiceRequest, ServiceResponse},
    http::header::LOCATION,
    Error,
    HttpResponse,
};
use shopify_tools::Secret;

use crate::{
    route_table::Next,
    session::ShopSession,
    settings::{after_auth_hook, AppRoutes, AppSettings},
};

pub const API_KEY: &str = "test-api-key";
pub const SECRET: &str = "test-api-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const SESSION_KEY: &str = "test_app_session";
pub const SHOP: &str = "foo.myshopify.com";

pub fn settings(routes: AppRoutes) -> AppSettings {
    let mut settings =
        AppSettings::new(API_KEY, Secret::from(SECRET), SESSION_KEY, after_auth_hook(|_| async { Ok(()) }));
    settings.routes = routes;
    settings.scopes = vec!["read_products".into(), "write_orders".into()];
    settings.logger = Some(false);
    settings.webhook_secret = Some(Secret::from(WEBHOOK_SECRET));
    settings
}

pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response().cookies().find(|c| c.name() == SESSION_KEY).map(|c| c.into_owned())
}

pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers().get(LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string()
}

pub async fn body_string<B: MessageBody>(res: ServiceResponse<B>) -> String {
    String::from_utf8_lossy(&actix_web::test::read_body(res).await).into_owned()
}

/// Public route that logs the browser into [`SHOP`], standing in for a completed OAuth flow.
pub async fn login(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let session = ShopSession { shop: SHOP.into(), access_token: "shpat_test".into(), shop_id: "foo".into() };
    session.store(&req.get_session())?;
    Ok(req.into_response(HttpResponse::Ok().finish()))
}

/// Admin route answering with the session's shop.
pub async fn whoami(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let shop = ShopSession::load(&req.get_session())?.map(|s| s.shop).unwrap_or_default();
    Ok(req.into_response(HttpResponse::Ok().body(shop)))
}

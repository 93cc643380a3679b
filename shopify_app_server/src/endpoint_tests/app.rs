use std::fs;

use actix_web::{
    http::{header, StatusCode},
    test::{call_service, init_service, TestRequest},
};

use super::helpers::{body_string, location, login, session_cookie, settings, whoami, SHOP};
use crate::{
    middleware::StaticPath,
    route_table::{HandlerChain, RouteTable},
    routes::health,
    settings::{AppRoutes, RouteGroup},
    ShopifyApp,
};

fn routes() -> AppRoutes {
    AppRoutes {
        api: RouteGroup::new(
            RouteTable::new()
                .route("get", "/health", HandlerChain::single(health))
                .route("post", "/login", HandlerChain::single(login)),
        ),
        admin: RouteGroup::new(RouteTable::new().route("get", "/me", HandlerChain::single(whoami))),
        webhooks: Vec::new(),
    }
}

#[actix_web::test]
async fn public_api_needs_no_session() {
    let _ = env_logger::try_init().ok();
    let app = ShopifyApp::new(settings(routes())).unwrap();
    let app = init_service(app.build()).await;
    let res = call_service(&app, TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("X-Frame-Options").unwrap(), "ALLOWALL");
    assert_eq!(body_string(res).await, "👍️\n");
}

#[actix_web::test]
async fn admin_api_redirects_to_auth_without_a_session() {
    let _ = env_logger::try_init().ok();
    let app = ShopifyApp::new(settings(routes())).unwrap();
    let app = init_service(app.build()).await;

    let res = call_service(&app, TestRequest::get().uri("/api/admin/me").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth");

    let req = TestRequest::get().uri(&format!("/api/admin/me?shop={SHOP}")).to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), format!("/auth?shop={SHOP}"));

    // Only valid shop domains are passed on
    let req = TestRequest::get().uri("/api/admin/me?shop=evil.example.com").to_request();
    let res = call_service(&app, req).await;
    assert_eq!(location(&res), "/auth");
}

#[actix_web::test]
async fn admin_api_is_served_with_a_session() {
    let _ = env_logger::try_init().ok();
    let app = ShopifyApp::new(settings(routes())).unwrap();
    let app = init_service(app.build()).await;

    let res = call_service(&app, TestRequest::post().uri("/api/login").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = session_cookie(&res).expect("login should set the session cookie");
    assert!(cookie.secure().unwrap_or(false));

    let req = TestRequest::get().uri("/api/admin/me").cookie(cookie).to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, SHOP);
}

#[actix_web::test]
async fn lookalike_prefixes_are_not_public() {
    let _ = env_logger::try_init().ok();
    let app = ShopifyApp::new(settings(routes())).unwrap();
    let app = init_service(app.build()).await;
    for path in ["/api-docs/health", "/", "/api/admin"] {
        let res = call_service(&app, TestRequest::get().uri(path).to_request()).await;
        assert_eq!(res.status(), StatusCode::FOUND, "{path} should need a session");
    }
}

#[actix_web::test]
async fn cors_reflects_the_origin() {
    let _ = env_logger::try_init().ok();
    let app = ShopifyApp::new(settings(routes())).unwrap();
    let app = init_service(app.build()).await;
    let req = TestRequest::get()
        .uri("/api/health")
        .insert_header((header::ORIGIN, "https://admin.shopify.com"))
        .to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://admin.shopify.com");
}

#[actix_web::test]
async fn static_files_are_served_without_a_session() {
    let _ = env_logger::try_init().ok();
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("static")).unwrap();
    fs::write(root.path().join("static/app.js"), "console.log('hi');").unwrap();
    let mut settings = settings(routes());
    settings.static_path = Some(StaticPath::Prefix("/static".into()));
    settings.static_root = root.path().to_path_buf();
    let app = ShopifyApp::new(settings).unwrap();
    let app = init_service(app.build()).await;

    let res = call_service(&app, TestRequest::get().uri("/static/app.js").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "console.log('hi');");

    let res = call_service(&app, TestRequest::get().uri("/static/missing.js").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = call_service(&app, TestRequest::get().uri("/static/../secret.txt").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn static_directories_are_not_served() {
    let _ = env_logger::try_init().ok();
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("static/sub")).unwrap();
    let mut settings = settings(routes());
    settings.static_path = Some(StaticPath::Prefix("/static".into()));
    settings.static_root = root.path().to_path_buf();
    let app = ShopifyApp::new(settings).unwrap();
    let app = init_service(app.build()).await;

    for path in ["/static/sub", "/static/sub/", "/static/"] {
        let res = call_service(&app, TestRequest::get().uri(path).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path} is a directory");
        assert_eq!(body_string(res).await, "");
    }
}

#[actix_web::test]
async fn static_predicates_select_requests() {
    let _ = env_logger::try_init().ok();
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("index.html"), "<html></html>").unwrap();
    let mut settings = settings(routes());
    settings.static_path = Some(StaticPath::predicate(|req| req.path().ends_with(".html")));
    settings.static_root = root.path().to_path_buf();
    let app = ShopifyApp::new(settings).unwrap();
    let app = init_service(app.build()).await;
    let res = call_service(&app, TestRequest::get().uri("/index.html").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "<html></html>");
}

#[test]
fn unsupported_methods_fail_assembly() {
    let mut routes = routes();
    routes.admin.routes.insert("fetch", "/me", HandlerChain::single(whoami));
    let err = ShopifyApp::new(settings(routes)).err().expect("assembly should fail");
    assert!(err.to_string().contains("'fetch' is not a supported method"), "was: {err}");
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    test::{call_service, init_service, TestRequest},
    Error,
    HttpMessage,
    HttpResponse,
};
use shopify_tools::helpers::calculate_hmac;

use super::helpers::{body_string, settings, WEBHOOK_SECRET};
use crate::{
    middleware::{WebhookDelivery, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER},
    route_table::{HandlerChain, Next, RouteTable},
    settings::{AppRoutes, RouteGroup},
    ShopifyApp,
};

const ORDER_JSON: &str = r#"{"id":820982911946154508,"email":"jon@example.com","total_price":"199.00"}"#;

async fn order_created(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let delivery = req.extensions().get::<WebhookDelivery>().cloned();
    let body = match delivery {
        Some(d) => format!("{} {} {}", d.topic, d.shop_domain, d.payload["id"]),
        None => "no delivery".to_string(),
    };
    Ok(req.into_response(HttpResponse::Ok().body(body)))
}

async fn plain_post(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    Ok(req.into_response(HttpResponse::Created().finish()))
}

fn app_with_counter() -> (ShopifyApp, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let count = move |req: ServiceRequest, next: Next| {
        counter.fetch_add(1, Ordering::SeqCst);
        next.call(req)
    };
    let api = RouteTable::new().route("post", "/webhooks/orders", HandlerChain::single(plain_post));
    let routes = AppRoutes { api: RouteGroup::new(api), ..Default::default() }
        .webhook("/webhooks/orders", HandlerChain::single(count).then(order_created));
    let app = ShopifyApp::new(settings(routes)).expect("app should assemble");
    (app, calls)
}

fn signed(body: &str, signature: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/webhooks/orders")
        .insert_header((HMAC_HEADER, signature.to_string()))
        .insert_header((TOPIC_HEADER, "orders/create"))
        .insert_header((SHOP_DOMAIN_HEADER, "foo.myshopify.com"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn verified_webhooks_reach_the_handler() {
    let _ = env_logger::try_init().ok();
    let (app, calls) = app_with_counter();
    let app = init_service(app.build()).await;
    let signature = calculate_hmac(WEBHOOK_SECRET, ORDER_JSON.as_bytes());
    let res = call_service(&app, signed(ORDER_JSON, &signature).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "orders/create foo.myshopify.com 820982911946154508");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (app, calls) = app_with_counter();
    let app = init_service(app.build()).await;
    let signature = calculate_hmac("some other secret", ORDER_JSON.as_bytes());
    let res = call_service(&app, signed(ORDER_JSON, &signature).to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(res).await, r#"{"error":"Authentication Error. Invalid webhook signature."}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn tampered_bodies_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (app, calls) = app_with_counter();
    let app = init_service(app.build()).await;
    let signature = calculate_hmac(WEBHOOK_SECRET, ORDER_JSON.as_bytes());
    let tampered = ORDER_JSON.replace("199.00", "1.00");
    let res = call_service(&app, signed(&tampered, &signature).to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn missing_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (app, calls) = app_with_counter();
    let app = init_service(app.build()).await;
    let req = TestRequest::post().uri("/api/webhooks/orders").set_payload(ORDER_JSON).to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(res).await, r#"{"error":"Authentication Error. No webhook signature found."}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn webhooks_only_answer_post() {
    let _ = env_logger::try_init().ok();
    let (app, _) = app_with_counter();
    let app = init_service(app.build()).await;
    let res = call_service(&app, TestRequest::get().uri("/api/webhooks/orders").to_request()).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[actix_web::test]
async fn signed_garbage_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let (app, calls) = app_with_counter();
    let app = init_service(app.build()).await;
    let signature = calculate_hmac(WEBHOOK_SECRET, b"not json");
    let res = call_service(&app, signed("not json", &signature).to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

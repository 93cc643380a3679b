use std::sync::Arc;

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, StatusCode},
    test::{call_service, init_service, TestRequest},
    App,
    Error,
    HttpMessage,
    HttpResponse,
};

use super::helpers::body_string;
use crate::{
    route_table::{HandlerChain, Next, RouteHandler, RouteTable},
    routes::{bind_routes, RouteRegistry, Router},
};

#[derive(Clone, Default)]
struct Trail(Vec<&'static str>);

/// Leaves its name in the request and hands on to the next handler.
fn step(name: &'static str) -> impl RouteHandler {
    move |req: ServiceRequest, next: Next| async move {
        let mut trail = req.extensions_mut().remove::<Trail>().unwrap_or_default();
        trail.0.push(name);
        req.extensions_mut().insert(trail);
        next.call(req).await
    }
}

/// Answers with the names of every handler that ran before it.
async fn trail(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let trail = req.extensions().get::<Trail>().cloned().unwrap_or_default();
    Ok(req.into_response(HttpResponse::Ok().body(trail.0.join(","))))
}

async fn order_id(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let id = req.match_info().get("id").unwrap_or_default().to_string();
    Ok(req.into_response(HttpResponse::Ok().body(id)))
}

async fn forbidden(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    Ok(req.into_response(HttpResponse::Forbidden().finish()))
}

fn registry(table: &RouteTable, middleware: Option<Arc<dyn RouteHandler>>) -> RouteRegistry {
    let mut registry = RouteRegistry::new("/api").with_middleware(middleware);
    bind_routes(&mut registry, table).expect("routes should bind");
    registry
}

#[actix_web::test]
async fn handlers_run_in_declared_order() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new()
        .route("get", "/products", HandlerChain::single(step("a")).then(step("b")).then(trail))
        .route("post", "/products", HandlerChain::single(step("c")).then(trail));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;

    let res = call_service(&app, TestRequest::get().uri("/api/products").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "a,b");

    let res = call_service(&app, TestRequest::post().uri("/api/products").to_request()).await;
    assert_eq!(body_string(res).await, "c");
}

#[actix_web::test]
async fn a_handler_that_answers_stops_the_chain() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new().route("get", "/secret", HandlerChain::single(forbidden).then(trail));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;
    let res = call_service(&app, TestRequest::get().uri("/api/secret").to_request()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unregistered_methods_are_not_allowed() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new().route("get", "/products", HandlerChain::single(trail));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;
    let res = call_service(&app, TestRequest::delete().uri("/api/products").to_request()).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let res = call_service(&app, TestRequest::get().uri("/api/nothing-here").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn get_routes_also_answer_head() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new()
        .route("get", "/products", HandlerChain::single(trail))
        .route("post", "/orders", HandlerChain::single(trail))
        .route("get", "/secret", HandlerChain::single(trail))
        .route("head", "/secret", HandlerChain::single(forbidden));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;

    let req = TestRequest::default().method(Method::HEAD).uri("/api/products").to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = TestRequest::default().method(Method::HEAD).uri("/api/orders").to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let req = TestRequest::default().method(Method::HEAD).uri("/api/secret").to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN, "an explicit HEAD route takes precedence");
}

#[actix_web::test]
async fn all_matches_every_method() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new().route("all", "/anything", HandlerChain::single(step("any")).then(trail));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;
    for req in [TestRequest::get(), TestRequest::patch(), TestRequest::put()] {
        let res = call_service(&app, req.uri("/api/anything").to_request()).await;
        assert_eq!(body_string(res).await, "any");
    }
}

#[actix_web::test]
async fn later_entries_for_a_path_win() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new()
        .route("get", "/products", HandlerChain::single(step("first")).then(trail))
        .route("get", "/products", HandlerChain::single(step("second")).then(trail));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;
    let res = call_service(&app, TestRequest::get().uri("/api/products").to_request()).await;
    assert_eq!(body_string(res).await, "second");
}

#[actix_web::test]
async fn path_parameters_are_available() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new().route("get", "/orders/:id", HandlerChain::single(order_id));
    let app = init_service(App::new().service(registry(&table, None).scope())).await;
    let res = call_service(&app, TestRequest::get().uri("/api/orders/1234").to_request()).await;
    assert_eq!(body_string(res).await, "1234");
}

#[actix_web::test]
async fn group_middleware_runs_before_every_route() {
    let _ = env_logger::try_init().ok();
    let table = RouteTable::new()
        .route("get", "/a", HandlerChain::single(step("a")).then(trail))
        .route("post", "/b", HandlerChain::single(trail));
    let middleware: Arc<dyn RouteHandler> = Arc::new(step("group"));
    let app = init_service(App::new().service(registry(&table, Some(middleware)).scope())).await;
    let res = call_service(&app, TestRequest::get().uri("/api/a").to_request()).await;
    assert_eq!(body_string(res).await, "group,a");
    let res = call_service(&app, TestRequest::post().uri("/api/b").to_request()).await;
    assert_eq!(body_string(res).await, "group");
}

/// Records registrations instead of serving them.
#[derive(Default)]
struct Recorder(Vec<(String, String, usize)>);

impl Router for Recorder {
    type Error = ();

    fn register(&mut self, method: &str, path: &str, handlers: HandlerChain) -> Result<(), ()> {
        self.0.push((method.to_string(), path.to_string(), handlers.len()));
        Ok(())
    }
}

#[test]
fn binder_passes_every_triple_through_in_order() {
    let table = RouteTable::new()
        .route("get", "/a", HandlerChain::single(trail))
        .route("post", "/a", HandlerChain::single(step("x")).then(trail))
        .route("get", "/b", HandlerChain::single(trail))
        .route("fetch", "/c", HandlerChain::single(trail));
    let mut recorder = Recorder::default();
    bind_routes(&mut recorder, &table).unwrap();
    let expected = vec![
        ("get".to_string(), "/a".to_string(), 1),
        ("get".to_string(), "/b".to_string(), 1),
        ("post".to_string(), "/a".to_string(), 2),
        ("fetch".to_string(), "/c".to_string(), 1),
    ];
    assert_eq!(recorder.0, expected);
}

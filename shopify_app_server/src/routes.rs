//! Binding route tables onto a router.
//!
//! [`bind_routes`] walks a [`RouteTable`] and registers every (method, path, handlers) triple on anything that
//! implements [`Router`]. It performs no validation of its own; rejecting an unknown method is the router's job.
//!
//! [`RouteRegistry`] is the actix-web router. It records the bindings at startup, where configuration errors can
//! still be reported, and turns them into a [`Scope`] for every worker. Paths registered under one method answer
//! `405 Method Not Allowed` for the others.

use std::sync::Arc;

use actix_session::SessionExt;
use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    web,
    Error,
    HttpRequest,
    HttpResponse,
    Scope,
};
use log::*;
use serde_json::Value;
use shopify_tools::RequestOptions;

use crate::{
    errors::{AuthError, ServerError},
    route_table::{HandlerChain, Next, RouteHandler, RouteTable},
    server::AppContext,
    session::ShopSession,
};

pub trait Router {
    type Error;

    fn register(&mut self, method: &str, path: &str, handlers: HandlerChain) -> Result<(), Self::Error>;
}

/// Registers every route in `table` on `router`, in table order.
pub fn bind_routes<R: Router>(router: &mut R, table: &RouteTable) -> Result<(), R::Error> {
    for (method, path, handlers) in table.iter() {
        router.register(method, path, handlers.clone())?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct RouteBinding {
    /// `None` matches any method.
    pub method: Option<Method>,
    pub path: String,
    pub handlers: HandlerChain,
}

#[derive(Clone)]
pub struct RouteRegistry {
    prefix: String,
    middleware: Option<Arc<dyn RouteHandler>>,
    bindings: Vec<RouteBinding>,
}

impl RouteRegistry {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), middleware: None, bindings: Vec::new() }
    }

    /// A handler that runs in front of every route registered afterwards.
    pub fn with_middleware(mut self, middleware: Option<Arc<dyn RouteHandler>>) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    /// Builds the actix scope. Bindings sharing a path become one resource, in order of first registration. A GET
    /// binding also answers HEAD unless the path has a HEAD binding of its own.
    pub fn scope(&self) -> Scope {
        let mut paths: Vec<&str> = Vec::new();
        for binding in &self.bindings {
            if !paths.contains(&binding.path.as_str()) {
                paths.push(&binding.path);
            }
        }
        let mut scope = web::scope(&self.prefix);
        for path in paths {
            let mut resource = web::resource(path);
            let bindings = self.bindings.iter().filter(|b| b.path == path).collect::<Vec<_>>();
            for binding in &bindings {
                resource = resource.route(dispatch_route(binding.method.clone(), &binding.handlers));
            }
            let has_method = |m: &Method| bindings.iter().any(|b| b.method.as_ref() == Some(m));
            if let Some(get) = bindings.iter().find(|b| b.method == Some(Method::GET)) {
                if !has_method(&Method::HEAD) {
                    resource = resource.route(dispatch_route(Some(Method::HEAD), &get.handlers));
                }
            }
            scope = scope.service(resource);
        }
        scope
    }
}

impl Router for RouteRegistry {
    type Error = ServerError;

    fn register(&mut self, method: &str, path: &str, handlers: HandlerChain) -> Result<(), Self::Error> {
        let method = parse_method(method).ok_or_else(|| {
            ServerError::ConfigurationError(format!("'{method}' is not a supported method for route {path}"))
        })?;
        let handlers = match &self.middleware {
            Some(mw) => handlers.prepend(Arc::clone(mw)),
            None => handlers,
        };
        let path = to_router_path(path);
        debug!("Registered {} {}{path}", method.as_ref().map(Method::as_str).unwrap_or("*"), self.prefix);
        self.bindings.push(RouteBinding { method, path, handlers });
        Ok(())
    }
}

fn dispatch_route(method: Option<Method>, handlers: &HandlerChain) -> actix_web::Route {
    let handlers = handlers.clone();
    let route = match method {
        Some(method) => web::method(method),
        None => web::route(),
    };
    route.to(move |req: HttpRequest, payload: web::Payload| {
        let handlers = handlers.clone();
        async move {
            let req = ServiceRequest::from_parts(req, payload.into_inner());
            let res = handlers.dispatch(req).await?;
            Ok::<HttpResponse, Error>(res.into_parts().1)
        }
    })
}

/// `Some(None)` for `all`, which matches every method.
fn parse_method(method: &str) -> Option<Option<Method>> {
    match method.to_lowercase().as_str() {
        "get" => Some(Some(Method::GET)),
        "post" => Some(Some(Method::POST)),
        "put" => Some(Some(Method::PUT)),
        "patch" => Some(Some(Method::PATCH)),
        "delete" | "del" => Some(Some(Method::DELETE)),
        "head" => Some(Some(Method::HEAD)),
        "options" => Some(Some(Method::OPTIONS)),
        "all" => Some(None),
        _ => None,
    }
}

/// Rewrites `:name` path parameters as `{name}`.
pub fn to_router_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn health(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    Ok(req.into_response(HttpResponse::Ok().body("👍️\n")))
}

/// The logged-in shop's `shop.json`, fetched with the session's access token.
pub async fn shop_details(req: ServiceRequest, _next: Next) -> Result<ServiceResponse, Error> {
    let ctx = req
        .app_data::<web::Data<AppContext>>()
        .cloned()
        .ok_or_else(|| ServerError::InitializeError("AppContext is not registered".into()))?;
    let session =
        ShopSession::load(&req.get_session())?.ok_or(ServerError::AuthenticationError(AuthError::MissingShop))?;
    let opts = RequestOptions::get().api_version(ctx.api_version.as_str());
    let shop: Value = ctx
        .api
        .request(&session.access_token, &session.shop, "shop", opts)
        .await
        .map_err(ServerError::from)?;
    Ok(req.into_response(HttpResponse::Ok().json(shop)))
}

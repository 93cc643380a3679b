//! Declarative route tables.
//!
//! A [`RouteTable`] maps an HTTP method name to an ordered set of paths, each with a [`HandlerChain`]. Handlers in a
//! chain run in order, and each one decides whether to answer the request or hand it to the next handler by calling
//! [`Next::call`]. This is what lets a webhook signature check sit in front of the handler that processes the
//! payload.

use std::{future::Future, sync::Arc};

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    Error,
    HttpResponse,
};
use futures::future::LocalBoxFuture;

/// One step of a handler chain.
///
/// Any `Fn(ServiceRequest, Next) -> impl Future<Output = Result<ServiceResponse, Error>>` that is `Send + Sync` is a
/// handler, so plain `async fn`s work too.
pub trait RouteHandler: Send + Sync + 'static {
    fn handle(&self, req: ServiceRequest, next: Next) -> LocalBoxFuture<'static, Result<ServiceResponse, Error>>;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(ServiceRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ServiceResponse, Error>> + 'static,
{
    fn handle(&self, req: ServiceRequest, next: Next) -> LocalBoxFuture<'static, Result<ServiceResponse, Error>> {
        Box::pin(self(req, next))
    }
}

/// An ordered, non-empty list of handlers for one (method, path) pair.
#[derive(Clone)]
pub struct HandlerChain {
    handlers: Arc<[Arc<dyn RouteHandler>]>,
}

impl HandlerChain {
    pub fn single<H: RouteHandler>(handler: H) -> Self {
        Self { handlers: Arc::from(vec![Arc::new(handler) as Arc<dyn RouteHandler>]) }
    }

    pub fn from_shared(handler: Arc<dyn RouteHandler>) -> Self {
        Self { handlers: Arc::from(vec![handler]) }
    }

    /// Appends a handler that runs after the current ones, if they call `next`.
    pub fn then<H: RouteHandler>(self, handler: H) -> Self {
        self.then_shared(Arc::new(handler))
    }

    pub fn then_shared(self, handler: Arc<dyn RouteHandler>) -> Self {
        let mut handlers = self.handlers.to_vec();
        handlers.push(handler);
        Self { handlers: handlers.into() }
    }

    /// Returns a chain with `handler` in front of the current handlers.
    pub fn prepend(&self, handler: Arc<dyn RouteHandler>) -> Self {
        let mut handlers = Vec::with_capacity(self.handlers.len() + 1);
        handlers.push(handler);
        handlers.extend(self.handlers.iter().cloned());
        Self { handlers: handlers.into() }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the chain from the first handler.
    pub async fn dispatch(&self, req: ServiceRequest) -> Result<ServiceResponse, Error> {
        Next { handlers: Arc::clone(&self.handlers), position: 0 }.call(req).await
    }
}

/// The rest of a handler chain.
pub struct Next {
    handlers: Arc<[Arc<dyn RouteHandler>]>,
    position: usize,
}

impl Next {
    /// Runs the next handler. Falling off the end of the chain answers 404, like an unmatched route.
    pub async fn call(self, req: ServiceRequest) -> Result<ServiceResponse, Error> {
        let Some(handler) = self.handlers.get(self.position).cloned() else {
            return Ok(req.into_response(HttpResponse::NotFound().finish()));
        };
        let next = Next { handlers: self.handlers, position: self.position + 1 };
        handler.handle(req, next).await
    }
}

/// Method name → ordered (path → handlers).
///
/// Method names are stored lower-case. Within one method a path appears at most once: inserting it again replaces
/// the handlers but keeps the original position.
#[derive(Clone, Default)]
pub struct RouteTable {
    methods: Vec<(String, Vec<(String, HandlerChain)>)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: &str, path: &str, handlers: HandlerChain) -> Self {
        self.insert(method, path, handlers);
        self
    }

    pub fn insert(&mut self, method: &str, path: &str, handlers: HandlerChain) {
        let method = method.to_lowercase();
        let idx = match self.methods.iter().position(|(m, _)| *m == method) {
            Some(idx) => idx,
            None => {
                self.methods.push((method, Vec::new()));
                self.methods.len() - 1
            },
        };
        let paths = &mut self.methods[idx].1;
        match paths.iter_mut().find(|(p, _)| p == path) {
            Some(entry) => entry.1 = handlers,
            None => paths.push((path.to_string(), handlers)),
        }
    }

    /// Every (method, path, handlers) triple, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &HandlerChain)> {
        self.methods
            .iter()
            .flat_map(|(method, paths)| paths.iter().map(move |(path, h)| (method.as_str(), path.as_str(), h)))
    }

    pub fn get(&self, method: &str, path: &str) -> Option<&HandlerChain> {
        let method = method.to_lowercase();
        self.iter().find(|(m, p, _)| *m == method && *p == path).map(|(_, _, h)| h)
    }

    pub fn len(&self) -> usize {
        self.methods.iter().map(|(_, paths)| paths.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

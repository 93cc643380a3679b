//! Path-gated request validation.
//!
//! The public API (`/api/...`) has to stay reachable without a session, e.g. for webhook deliveries, while the
//! admin API and everything outside `/api` needs a logged-in shop. [`ValidationGate`] applies a [`BypassPolicy`]
//! in front of any [`RequestValidator`]: bypassed requests go straight to the inner service, everything else is
//! handed to the validator, which either lets the request through or answers it.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::trace;

use crate::helpers::is_under;

pub const PUBLIC_API_PREFIX: &str = "/api";
pub const ADMIN_API_PREFIX: &str = "/api/admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassPolicy {
    pub public_prefix: String,
    pub protected_prefix: String,
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self { public_prefix: PUBLIC_API_PREFIX.into(), protected_prefix: ADMIN_API_PREFIX.into() }
    }
}

impl BypassPolicy {
    /// Prefixes are compared segment by segment, so `/api-other` is not part of the public API.
    pub fn requires_validation(&self, path: &str) -> bool {
        !(is_under(path, &self.public_prefix) && !is_under(path, &self.protected_prefix))
    }
}

pub enum Validation {
    /// Hand the request on to the rest of the pipeline.
    Continue(ServiceRequest),
    /// The validator answered the request itself (a redirect, a rejection, ...).
    Respond(ServiceResponse<BoxBody>),
}

pub trait RequestValidator: 'static {
    fn validate(&self, req: ServiceRequest) -> LocalBoxFuture<'static, Result<Validation, Error>>;
}

pub struct ValidationGate<V> {
    policy: BypassPolicy,
    validator: Rc<V>,
}

impl<V: RequestValidator> ValidationGate<V> {
    pub fn new(policy: BypassPolicy, validator: V) -> Self {
        Self { policy, validator: Rc::new(validator) }
    }
}

impl<S, B, V> Transform<S, ServiceRequest> for ValidationGate<V>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    V: RequestValidator,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = ValidationGateService<S, V>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ValidationGateService {
            policy: self.policy.clone(),
            validator: Rc::clone(&self.validator),
            service: Rc::new(service),
        }))
    }
}

pub struct ValidationGateService<S, V> {
    policy: BypassPolicy,
    validator: Rc<V>,
    service: Rc<S>,
}

impl<S, B, V> Service<ServiceRequest> for ValidationGateService<S, V>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    V: RequestValidator,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        if !self.policy.requires_validation(req.path()) {
            trace!("🔐️ {} is public. Skipping validation.", req.path());
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok::<_, Error>(res.map_into_left_body::<BoxBody>())
            });
        }
        let validator = Rc::clone(&self.validator);
        Box::pin(async move {
            let res = match validator.validate(req).await? {
                Validation::Continue(req) => service.call(req).await?.map_into_left_body::<BoxBody>(),
                Validation::Respond(res) => res.map_into_right_body::<B>(),
            };
            Ok::<_, Error>(res)
        })
    }
}

//! Serves files from a directory for requests selected by a [`StaticPath`]. Anything else goes on down the
//! pipeline.

use std::{
    fmt,
    future::{ready, Ready},
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use actix_files::NamedFile;
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpResponse,
};
use futures::future::LocalBoxFuture;
use log::{debug, warn};

use crate::helpers::is_under;

/// Which requests are answered from the static root.
#[derive(Clone)]
pub enum StaticPath {
    /// Every path under this prefix, e.g. `/static`.
    Prefix(String),
    Predicate(Arc<dyn Fn(&ServiceRequest) -> bool + Send + Sync>),
}

impl StaticPath {
    pub fn predicate<F>(f: F) -> Self
    where F: Fn(&ServiceRequest) -> bool + Send + Sync + 'static {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, req: &ServiceRequest) -> bool {
        match self {
            Self::Prefix(prefix) => is_under(req.path(), prefix),
            Self::Predicate(f) => f(req),
        }
    }
}

impl fmt::Debug for StaticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(p) => write!(f, "Prefix({p})"),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// Maps a request path onto a file below `root`. Paths trying to leave the root (`..`) are refused.
pub fn resolve_static_file(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut file = root.to_path_buf();
    for segment in request_path.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        file.push(segment);
    }
    Some(file)
}

pub struct StaticFiles {
    path: Option<StaticPath>,
    root: Rc<PathBuf>,
}

impl StaticFiles {
    pub fn new(path: Option<StaticPath>, root: PathBuf) -> Self {
        Self { path, root: Rc::new(root) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StaticFiles
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = StaticFilesService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StaticFilesService { path: self.path.clone(), root: Rc::clone(&self.root), service: Rc::new(service) }))
    }
}

pub struct StaticFilesService<S> {
    path: Option<StaticPath>,
    root: Rc<PathBuf>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for StaticFilesService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let is_static = self.path.as_ref().is_some_and(|p| p.matches(&req));
        if !is_static {
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok::<_, Error>(res.map_into_left_body::<BoxBody>())
            });
        }
        let file = resolve_static_file(&self.root, req.path());
        Box::pin(async move {
            let Some(file) = file else {
                warn!("Refusing to serve {} from outside the static root", req.path());
                let res = req.into_response(HttpResponse::NotFound().finish());
                return Ok::<_, Error>(res.map_into_right_body::<B>());
            };
            let res = match NamedFile::open_async(&file).await {
                Ok(named) if named.metadata().is_dir() => {
                    debug!("{} is a directory, not serving it", file.display());
                    req.into_response(HttpResponse::NotFound().finish())
                },
                Ok(named) => {
                    debug!("Serving static file {}", file.display());
                    let (http_req, _) = req.into_parts();
                    let res = named.into_response(&http_req);
                    ServiceResponse::new(http_req, res)
                },
                Err(e) => {
                    debug!("Could not serve static file {}. {e}", file.display());
                    req.error_response(e)
                },
            };
            Ok::<_, Error>(res.map_into_right_body::<B>())
        })
    }
}

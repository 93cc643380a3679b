use actix_http::h1;
use actix_web::{dev::Payload, web};

/// True if `path` is `prefix` itself or lies below it. `/api/orders` is under `/api`; `/api-docs` is not.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Puts an already-consumed body back so that handlers further down can read it again.
pub fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}

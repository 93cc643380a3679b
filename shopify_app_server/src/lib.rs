//! # Shopify app server
//! The backend shell of a Shopify embedded app. It is responsible for:
//! * Running shops through the OAuth install flow and keeping the result in a cookie session.
//! * Keeping everything outside the public API behind that session.
//! * Checking the signature on incoming webhooks before the app's handlers see them.
//! * Registering the app's webhooks for every shop that logs in.
//! * Serving the app's static assets.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//! Embedding applications build [`settings::AppSettings`] directly.
//!
//! ## Routes
//! * `/auth`, `/auth/callback`: the OAuth flow.
//! * `/api/...`: public routes and webhook receivers, declared in a [`route_table::RouteTable`].
//! * `/api/admin/...`: routes that need a logged-in shop.

pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod route_table;
pub mod session;
pub mod settings;

pub mod helpers;
pub mod routes;
pub mod server;

pub use server::{AppContext, ShopifyApp};

use std::{env, path::PathBuf};

use log::*;
use shopify_tools::ShopifyConfig;

use crate::settings::{DEFAULT_BIND_ADDRESS, DEFAULT_STATIC_ROOT};

const DEFAULT_APP_PORT: u16 = 8081;
const DEFAULT_SESSION_KEY: &str = "shopify_app_session";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name of the session cookie.
    pub session_key: String,
    /// Request logging on or off. Unset means "on in debug builds".
    pub logger: Option<bool>,
    /// Requests under this path prefix are served from `static_root`. Unset disables static files.
    pub static_path: Option<String>,
    pub static_root: PathBuf,
    /// Shopify app credentials and OAuth settings
    pub shopify: ShopifyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_APP_PORT,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            logger: None,
            static_path: None,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
            shopify: ShopifyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("APP_BIND_ADDRESS").ok().unwrap_or_else(|| DEFAULT_BIND_ADDRESS.into());
        let port = env::var("APP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for APP_PORT. {e} Using the default, {DEFAULT_APP_PORT}, instead."
                    );
                    DEFAULT_APP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_APP_PORT);
        let session_key = env::var("APP_SESSION_KEY").ok().unwrap_or_else(|| {
            info!("🪛️ APP_SESSION_KEY is not set. Using {DEFAULT_SESSION_KEY} as the session cookie name.");
            DEFAULT_SESSION_KEY.to_string()
        });
        let logger = env::var("APP_LOGGER").ok().and_then(|s| parse_flag(&s));
        let static_path = env::var("APP_STATIC_PATH").ok().filter(|s| !s.is_empty());
        let static_root =
            env::var("APP_STATIC_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_ROOT));
        match &static_path {
            Some(p) => info!("🪛️ Serving {p} from {}", static_root.display()),
            None => debug!("🪛️ APP_STATIC_PATH is not set. Static files are disabled."),
        }
        let shopify = ShopifyConfig::new_from_env_or_default();
        Self { host, port, session_key, logger, static_path, static_root, shopify }
    }
}

/// `1`/`true`/`on` and `0`/`false`/`off`. Anything else is ignored with a warning.
fn parse_flag(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => {
            warn!("🪛️ Ignoring invalid value for APP_LOGGER: {s}");
            None
        },
    }
}

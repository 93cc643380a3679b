pub mod shopify;

pub use shopify::{ShopifyGateway, ShopifyPlatform};

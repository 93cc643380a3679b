use dotenvy::dotenv;
use log::info;
use shopify_app_server::{
    cli::handle_command_line_args,
    config::ServerConfig,
    route_table::{HandlerChain, RouteTable},
    routes::{health, shop_details},
    settings::{after_auth_hook, AppRoutes, AppSettings, RouteGroup},
    ShopifyApp,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();
    let routes = AppRoutes {
        api: RouteGroup::new(RouteTable::new().route("get", "/health", HandlerChain::single(health))),
        admin: RouteGroup::new(RouteTable::new().route("get", "/shop", HandlerChain::single(shop_details))),
        webhooks: Vec::new(),
    };
    let after_auth = after_auth_hook(|ctx| async move {
        info!("🔐️ {} ({}) installed the app with scopes [{}]", ctx.shop, ctx.shop_id, ctx.scope);
        Ok(())
    });
    let settings = AppSettings::from_config(&config, routes, after_auth);
    let app = match ShopifyApp::new(settings) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e}");
            return;
        },
    };
    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match app.listen(config.port).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

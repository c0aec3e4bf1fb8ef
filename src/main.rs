// src/main.rs
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use governor::RateLimiter;
use log::{error, info};
use std::sync::Arc;

use querybot::config::{Config, RegistryBackend};
use querybot::handlers;
use querybot::utils::{AdminToken, CommunityRateLimiter};
use querybot::{MemoryRegistry, QueryClient, QueryService, ServerRegistry, SqliteRegistry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();

    let mut sqlite = None;
    let registry: Arc<dyn ServerRegistry> = match config.registry_backend {
        RegistryBackend::Sqlite => match SqliteRegistry::connect(&config.database_url()).await {
            Ok(registry) => {
                let registry = Arc::new(registry);
                sqlite = Some(registry.clone());
                registry as Arc<dyn ServerRegistry>
            }
            Err(e) => {
                error!("Failed to open server registry at {}: {}", config.db_path, e);
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to open server registry: {}", e),
                ));
            }
        },
        RegistryBackend::Memory => {
            info!("Using in-memory server registry; entries will not survive a restart");
            Arc::new(MemoryRegistry::new())
        }
    };

    let service = web::Data::new(QueryService::new(
        registry,
        QueryClient::new(config.query_timeout()),
        config.default_query_port,
    ));
    let rate_limiter: web::Data<CommunityRateLimiter> =
        web::Data::new(RateLimiter::keyed(config.query_quota()));
    let admin_token = web::Data::new(AdminToken(config.admin_token.clone()));
    if config.admin_token.is_none() {
        info!("ADMIN_TOKEN not set; adding and removing servers is disabled");
    }

    let bind = config.bind();
    info!(
        "Starting server on {} (query timeout {:?}, default port {})",
        bind,
        config.query_timeout(),
        config.default_query_port
    );
    let result = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(rate_limiter.clone())
            .app_data(admin_token.clone())
            .configure(handlers::configure)
    })
    .bind(&bind)?
    .run()
    .await;

    if let Some(registry) = sqlite {
        registry.close().await;
        info!("Closed server registry");
    }
    result
}

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use booking_server::auth::{Argon2Hasher, SessionStore};
use booking_server::config::Config;
use booking_server::routes::create_routes;
use booking_server::services::Services;
use booking_server::state::AppState;
use booking_server::store::{MemoryStore, PgStore, Store};
use booking_server::utils::error::AppError;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,booking_server=debug,tower_http=info")),
        )
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!(error = ?e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let store = open_store(&config).await?;
    let services = Services::new(store, Arc::new(Argon2Hasher::default()));

    if let Some(seed) = &config.admin {
        let admin = services
            .users
            .bootstrap_admin(&seed.username, &seed.email, &seed.password)
            .await?;
        tracing::info!("Administrator account ready: {}", admin.email);
    } else {
        tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no administrator was seeded");
    }

    let state = AppState::new(services, SessionStore::new(config.session_ttl));
    let app = create_routes(state, &config);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| AppError::InternalServerError(format!("failed to bind {}: {}", config.bind_addr, e)))?;
    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(format!("server error: {}", e)))
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            tracing::info!("Successfully connected to database");
            store.migrate().await?;
            tracing::info!("Migrations run successfully");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

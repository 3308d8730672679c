//! Grain Settlement Engine - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use grain_settlement_backend::{
    create_app, load_rule_book, store::PgSettlementStore, AppState, Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let json_layer = config
        .log
        .json
        .then(|| tracing_subscriber::fmt::layer().json());
    let plain_layer = (!config.log.json).then(|| tracing_subscriber::fmt::layer());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gse_server=debug,grain_settlement_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(json_layer)
        .with(plain_layer)
        .init();

    tracing::info!("Starting Grain Settlement Engine");
    tracing::info!("Environment: {}", config.environment);

    let rules = Arc::new(load_rule_book(&config)?);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Create application state
    let state = AppState {
        db: db_pool.clone(),
        config: Arc::new(config.clone()),
        rules,
        store: Arc::new(PgSettlementStore::new(db_pool)),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use dotenvy::dotenv;
use linen_shop::{
    api::{self, AppState},
    config::{self, database},
    core::{auth, product},
    errors::{Error, Result},
};
use std::env;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Connect and create missing tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the first superadmin and the configured catalog
    // ADMIN_PASSWORD is read here, directly before use, not stored in AppConfig
    auth::seed_superadmin(&db, &app_config.admin, env::var("ADMIN_PASSWORD").ok())
        .await
        .inspect_err(|e| error!("Failed to seed superadmin: {e}"))?;
    product::seed_products(&db, &app_config.products)
        .await
        .inspect_err(|e| error!("Failed to seed products: {e}"))?;

    // 6. Serve
    let bind = app_config.server.bind.clone();
    let app = api::router(AppState::new(db, app_config));
    let listener = TcpListener::bind(&bind)
        .await
        .inspect_err(|e| error!("Failed to bind {bind}: {e}"))?;
    info!("Listening on {}", listener.local_addr().map_err(Error::Io)?);

    axum::serve(listener, app).await.map_err(Error::Io)
}

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use theatre_booking::{
    build_router,
    config::Config,
    database::Database,
    services::SeedService,
    store::{InMemoryStore, PgStore, Store},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.app.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.app.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;
    init_tracing(&config);

    info!(environment = %config.app.environment, "Starting Theatre Booking API");

    let store: Arc<dyn Store> = match config.database.url.as_deref() {
        Some(url) => {
            let db = Database::connect(url, &config.database)
                .await
                .context("failed to connect to database")?;
            if config.features.run_migrations {
                db.run_migrations().await.context("failed to run migrations")?;
            }
            Arc::new(PgStore::new(&db))
        }
        None if config.is_production() => {
            anyhow::bail!("DATABASE_URL must be set when ENVIRONMENT=production");
        }
        None => {
            warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    if config.features.seed_demo_data {
        SeedService::new(store.clone())
            .seed_demo_data()
            .await
            .context("failed to seed demo data")?;
        info!("Demo data seeded");
    }

    let addr = format!("{}:{}", config.app.host, config.app.port);
    let app = build_router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

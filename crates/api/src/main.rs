use std::sync::Arc;

use seatdesk_api::{build_router, state::AppState};
use seatdesk_config::{Settings, StorageBackend};
use seatdesk_db::{connect, indexes::ensure_indexes};
use seatdesk_services::{LogNotifier, MemoryStore, MongoStore, Store};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "seatdesk_api=debug,seatdesk_services=debug,seatdesk_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!("Starting Seatdesk API on {}:{}", settings.app.host, settings.app.port);
    info!(
        backend = ?settings.database.backend,
        max_workers = settings.licensing.max_workers,
        invitation_expiration_days = settings.licensing.invitation_expiration_days,
        "Licensing config"
    );
    if settings.licensing.cms_api_key.is_empty() {
        warn!("No back-office key configured; order confirmation is disabled");
    }

    let store: Arc<dyn Store> = match settings.database.backend {
        StorageBackend::Mongodb => {
            let client = connect(&settings).await?;
            let store = MongoStore::new(client, &settings.database.name);
            ensure_indexes(store.database()).await?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(store, Arc::new(LogNotifier), settings.clone());

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

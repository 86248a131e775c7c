use std::net::SocketAddr;

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use portfolio_tracker::{
    config::{self, StorageBackend},
    routes,
    services::{db_init, history_service::MongoHistoryStore, user_service},
    AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let settings = config::load();

    let state = match settings.storage {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            AppState::in_memory(settings.clone())
        }
        StorageBackend::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .map_err(|e| format!("failed to connect to MongoDB: {e}"))?;
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::warn!("index setup failed: {}", e);
            }

            let state = AppState::with_mongo(settings.clone(), db.clone());

            match user_service::ensure_demo_user(state.users.as_ref(), &settings).await {
                Ok(Some(demo_id)) => {
                    if let Err(e) = MongoHistoryStore::new(db).seed_sample(demo_id).await {
                        tracing::warn!("seeding demo history failed: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("seeding demo user failed: {}", e),
            }

            state
        }
    };

    if settings.storage == StorageBackend::Memory {
        if let Err(e) = user_service::ensure_demo_user(state.users.as_ref(), &settings).await {
            tracing::warn!("seeding demo user failed: {}", e);
        }
    }

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("invalid HOST {}: {e}", settings.host))?;
    let addr = SocketAddr::from((ip, settings.port));

    let app = routes::app(state);

    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {addr}: {e}"))?;
    axum::serve(listener, app).await.map_err(|e| e.to_string())
}

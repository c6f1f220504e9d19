mod auth;
mod config;
mod db;
mod employees;
mod errors;
mod images;
mod models;
mod prediction;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::employees::seed::seed_employees;
use crate::images::ImageStorage;
use crate::prediction::bundle::{BundlePaths, ModelBundle};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{CredentialStore, MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; malformed values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Salary Prediction API v{}", env!("CARGO_PKG_VERSION"));

    // Stores: Postgres when configured, otherwise process memory
    let (credentials, records): (Arc<dyn CredentialStore>, Arc<dyn RecordStore>) =
        match &config.database_url {
            Some(url) => {
                let store = Arc::new(PgStore::new(create_pool(url).await?));
                (
                    store.clone() as Arc<dyn CredentialStore>,
                    store as Arc<dyn RecordStore>,
                )
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone() as Arc<dyn CredentialStore>,
                    store as Arc<dyn RecordStore>,
                )
            }
        };

    if let Some(path) = &config.employee_seed_path {
        seed_employees(records.as_ref(), path).await?;
    }

    // Model bundle: a load failure degrades /predict instead of aborting
    let model = load_model(&config);

    let images = ImageStorage::new(&config.upload_dir, config.public_base_url.clone())?;

    let state = AppState {
        credentials,
        records,
        model,
        images,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_model(config: &Config) -> Option<Arc<ModelBundle>> {
    let paths = BundlePaths {
        model: config.model_path.clone(),
        encoder: config.encoder_path.clone(),
        columns: config.model_columns_path.clone(),
    };
    match ModelBundle::load(&paths) {
        Ok(bundle) => {
            info!(
                "Model and encoder loaded successfully ({} feature columns)",
                bundle.model_columns().len()
            );
            Some(Arc::new(bundle))
        }
        Err(e) => {
            error!(
                "Error loading model: {e}. Check that {}, {} and {} exist; /predict will return 500",
                paths.model.display(),
                paths.encoder.display(),
                paths.columns.display()
            );
            None
        }
    }
}

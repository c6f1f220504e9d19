use std::sync::Arc;

use crate::config::Config;
use crate::images::ImageStorage;
use crate::prediction::ModelBundle;
use crate::store::{CredentialStore, RecordStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub records: Arc<dyn RecordStore>,
    /// `None` when the artifacts failed to load; `/predict` then answers 500.
    pub model: Option<Arc<ModelBundle>>,
    pub images: ImageStorage,
    pub config: Config,
}

use axum::{extract::State, response::Html, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn home_handler() -> Html<&'static str> {
    Html("<p>Welcome to Salary Prediction API</p>")
}

/// GET /health
/// Returns a simple status object with service version and model availability.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "salary-api",
        "model_loaded": state.model.is_some()
    }))
}

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::prediction::PredictionError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub predicted_salary: f64,
}

/// POST /predict
pub async fn handle_predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let bundle = state
        .model
        .clone()
        .ok_or(PredictionError::ModelUnavailable)?;

    let Json(payload) = payload
        .map_err(|e| AppError::Validation(format!("Invalid prediction payload: {e}")))?;
    let Value::Object(attributes) = payload else {
        return Err(AppError::Validation(
            "Prediction payload must be a JSON object".to_string(),
        ));
    };
    debug!("Prediction payload: {attributes:?}");

    let predicted_salary = tokio::task::spawn_blocking(move || bundle.predict(&attributes))
        .await
        .map_err(|e| PredictionError::Failed(format!("inference task failed: {e}")))??;

    info!("Predicted salary {predicted_salary:.2}");
    Ok(Json(PredictionResponse { predicted_salary }))
}

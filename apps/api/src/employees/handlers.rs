use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /data
/// Every employee record, or a message object when there are none.
pub async fn handle_list_employees(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records = state.records.find_all().await?;
    if records.is_empty() {
        return Ok(Json(json!({ "message": "No employee data found" })));
    }
    Ok(Json(json!(records)))
}

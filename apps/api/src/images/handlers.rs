use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::images::{sanitize_filename, ImageError, ImagePathReport};
use crate::models::employee::{ProfilePicPatch, UpsertOutcome};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

struct UploadForm {
    employee_id: Option<String>,
    image: Option<(String, Bytes)>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        employee_id: None,
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "employeeId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable employeeId: {e}")))?;
                form.employee_id = Some(text.trim().to_string());
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable image: {e}")))?;
                form.image = Some((file_name, data));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /upload-image
///
/// Multipart form with `employeeId` and `image`. The file is written first; if
/// the employee does not exist (and creation is disabled) it is removed again.
pub async fn handle_upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let multipart =
        multipart.map_err(|_| AppError::Validation("Invalid request format".to_string()))?;
    let form = read_form(multipart).await?;

    let (Some(employee_id), Some((original_name, data))) = (
        form.employee_id.filter(|id| !id.is_empty()),
        form.image.filter(|(name, _)| !name.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Employee ID and image are required".to_string(),
        ));
    };

    let employee_number: i64 = employee_id.parse().map_err(|_| {
        AppError::Validation(format!(
            "Employee ID must be an integer, got '{employee_id}'"
        ))
    })?;

    if sanitize_filename(&original_name).is_none() {
        return Err(AppError::Validation(format!(
            "Image filename '{original_name}' is not usable"
        )));
    }

    let stored = state
        .images
        .save(employee_number, &original_name, &data)
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?;

    let patch = ProfilePicPatch {
        filename: stored.filename.clone(),
        path: stored.path.display().to_string(),
        uploaded_at: Utc::now(),
    };

    let outcome = match state
        .records
        .upsert_profile_pic(employee_number, &patch, state.config.upload_create_missing)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            state.images.remove(&stored.filename).await;
            return Err(AppError::Upload(e.to_string()));
        }
    };

    match outcome {
        UpsertOutcome::NotFound => {
            state.images.remove(&stored.filename).await;
            warn!("Upload rejected: employee {employee_number} does not exist");
            Err(AppError::EmployeeNotFound(employee_number))
        }
        UpsertOutcome::Matched | UpsertOutcome::Created => {
            if outcome == UpsertOutcome::Created {
                info!("Created employee record {employee_number} from image upload");
            }
            Ok(Json(UploadResponse {
                message: "Image uploaded successfully!".to_string(),
                image_url: state.images.url_for(&stored.filename),
            }))
        }
    }
}

/// GET /images/:filename
pub async fn handle_get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (bytes, content_type) = state.images.read(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// GET /test-image-path/:filename
pub async fn handle_inspect_image_path(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ImagePathReport>, AppError> {
    match state.images.inspect(&filename).await {
        Ok(report) => Ok(Json(report)),
        Err(ImageError::InvalidName(name)) => {
            Err(AppError::Validation(format!("Invalid image name '{name}'")))
        }
        Err(e) => Err(e.into()),
    }
}

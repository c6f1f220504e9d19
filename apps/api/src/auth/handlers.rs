use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::errors::AppError;
use crate::models::user::UserCredential;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    pub message: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// POST /register
pub async fn handle_register(
    State(state): State<AppState>,
    req: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) =
        req.map_err(|e| AppError::Validation(format!("Invalid registration body: {e}")))?;
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    if state.credentials.find_by_email(&email).await?.is_some() {
        return Err(AppError::DuplicateUser);
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {e}"))??;

    state
        .credentials
        .insert(UserCredential::new(email.clone(), password_hash, req.username))
        .await?;

    info!("Registered user {email}");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    // Malformed bodies fail like any other bad login.
    let Ok(Json(req)) = req else {
        return Err(AppError::InvalidCredentials);
    };
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::InvalidCredentials);
    };

    let user = state.credentials.find_by_email(&email).await?;

    let verified = tokio::task::spawn_blocking({
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        move || match stored_hash {
            Some(hash) => verify_password(&password, &hash).unwrap_or_else(|e| {
                warn!("Stored hash for a user could not be parsed: {e}");
                false
            }),
            None => {
                verify_against_dummy(&password);
                false
            }
        }
    })
    .await
    .map_err(|e| anyhow::anyhow!("Password verification task failed: {e}"))?;

    match user {
        Some(user) if verified => {
            info!("User {email} logged in");
            Ok(Json(LoginResponse {
                success: true,
                username: user.username,
                message: "Login successful".to_string(),
            }))
        }
        _ => {
            warn!("Failed login attempt for {email}");
            Err(AppError::InvalidCredentials)
        }
    }
}

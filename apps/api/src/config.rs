use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service runs on in-memory stores.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub model_path: PathBuf,
    pub encoder_path: PathBuf,
    pub model_columns_path: PathBuf,
    pub upload_dir: PathBuf,
    /// Prefix for the `imageUrl` returned by uploads, without trailing slash.
    pub public_base_url: String,
    /// When set, uploading an image for an unknown employee creates the record.
    pub upload_create_missing: bool,
    pub max_upload_bytes: usize,
    pub employee_seed_path: Option<PathBuf>,
    pub expose_debug_routes: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match non_empty(&lookup, "PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let public_base_url = non_empty(&lookup, "PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}"))
            .trim_end_matches('/')
            .to_string();

        let max_upload_bytes = match non_empty(&lookup, "MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Config {
            database_url: non_empty(&lookup, "DATABASE_URL"),
            port,
            rust_log: non_empty(&lookup, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
            model_path: path_or(&lookup, "MODEL_PATH", "salary_model.json"),
            encoder_path: path_or(&lookup, "ENCODER_PATH", "encoder.json"),
            model_columns_path: path_or(&lookup, "MODEL_COLUMNS_PATH", "model_columns.json"),
            upload_dir: path_or(&lookup, "UPLOAD_DIR", "uploads"),
            public_base_url,
            upload_create_missing: flag(&lookup, "UPLOAD_CREATE_MISSING")?,
            max_upload_bytes,
            employee_seed_path: non_empty(&lookup, "EMPLOYEE_SEED_PATH").map(PathBuf::from),
            expose_debug_routes: flag(&lookup, "EXPOSE_DEBUG_ROUTES")?,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn path_or<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(non_empty(lookup, key).unwrap_or_else(|| default.to_string()))
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
        },
    }
}

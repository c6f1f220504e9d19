use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_USERNAME: &str = "User";

/// A registered login. `password_hash` is an argon2id PHC string, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCredential {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl UserCredential {
    pub fn new(email: String, password_hash: String, username: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            username: username
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            created_at: Utc::now(),
        }
    }
}

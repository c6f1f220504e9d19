//! Persistence seams for credentials and employee records.
//!
//! `AppState` holds `Arc<dyn CredentialStore>` and `Arc<dyn RecordStore>`.
//! Postgres is used when `DATABASE_URL` is set; otherwise the in-memory store.
//! Every write is a single keyed operation, atomic per call in both backends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::employee::{EmployeeRecord, ProfilePicPatch, UpsertOutcome};
use crate::models::user::UserCredential;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the email is already taken.
    async fn insert(&self, credential: UserCredential) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All employee records ordered by employee number.
    async fn find_all(&self) -> Result<Vec<EmployeeRecord>, StoreError>;

    /// Merges `attributes` into the record, creating it if absent.
    async fn upsert_attributes(
        &self,
        employee_number: i64,
        attributes: Map<String, Value>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Writes profile picture metadata. With `create_if_missing == false` an
    /// unknown employee yields [`UpsertOutcome::NotFound`] and nothing is written.
    async fn upsert_profile_pic(
        &self,
        employee_number: i64,
        patch: &ProfilePicPatch,
        create_if_missing: bool,
    ) -> Result<UpsertOutcome, StoreError>;
}

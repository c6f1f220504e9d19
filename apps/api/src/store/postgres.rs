use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::employee::{EmployeeRecord, ProfilePicPatch, UpsertOutcome};
use crate::models::user::UserCredential;
use crate::store::{CredentialStore, RecordStore, StoreError};

/// Postgres-backed store. Tables are created by the embedded migrations.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    employee_number: i64,
    attributes: Json<Map<String, Value>>,
    profile_pic_filename: Option<String>,
    profile_pic_path: Option<String>,
    last_profile_pic_upload_timestamp: Option<DateTime<Utc>>,
}

impl From<EmployeeRow> for EmployeeRecord {
    fn from(row: EmployeeRow) -> Self {
        EmployeeRecord {
            employee_number: row.employee_number,
            profile_pic_filename: row.profile_pic_filename,
            profile_pic_path: row.profile_pic_path,
            last_profile_pic_upload_timestamp: row.last_profile_pic_upload_timestamp,
            attributes: row.attributes.0,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError> {
        let user = sqlx::query_as::<_, UserCredential>(
            "SELECT id, email, password_hash, username, created_at FROM user_credentials WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, credential: UserCredential) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_credentials (id, email, password_hash, username, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(credential.id)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(&credential.username)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // A concurrent registration may win between the lookup and the insert.
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_all(&self) -> Result<Vec<EmployeeRecord>, StoreError> {
        let rows: Vec<EmployeeRow> = sqlx::query_as(
            r#"
            SELECT employee_number, attributes, profile_pic_filename, profile_pic_path,
                   last_profile_pic_upload_timestamp
            FROM employees
            ORDER BY employee_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EmployeeRecord::from).collect())
    }

    async fn upsert_attributes(
        &self,
        employee_number: i64,
        attributes: Map<String, Value>,
    ) -> Result<UpsertOutcome, StoreError> {
        // xmax = 0 only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO employees (employee_number, attributes)
            VALUES ($1, $2)
            ON CONFLICT (employee_number)
            DO UPDATE SET attributes = employees.attributes || EXCLUDED.attributes
            RETURNING (xmax = 0)
            "#,
        )
        .bind(employee_number)
        .bind(Json(attributes))
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Matched
        })
    }

    async fn upsert_profile_pic(
        &self,
        employee_number: i64,
        patch: &ProfilePicPatch,
        create_if_missing: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        if !create_if_missing {
            let result = sqlx::query(
                r#"
                UPDATE employees
                SET profile_pic_filename = $2,
                    profile_pic_path = $3,
                    last_profile_pic_upload_timestamp = $4
                WHERE employee_number = $1
                "#,
            )
            .bind(employee_number)
            .bind(&patch.filename)
            .bind(&patch.path)
            .bind(patch.uploaded_at)
            .execute(&self.pool)
            .await?;

            return Ok(if result.rows_affected() == 0 {
                UpsertOutcome::NotFound
            } else {
                UpsertOutcome::Matched
            });
        }

        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO employees
                (employee_number, profile_pic_filename, profile_pic_path,
                 last_profile_pic_upload_timestamp)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (employee_number)
            DO UPDATE SET profile_pic_filename = EXCLUDED.profile_pic_filename,
                          profile_pic_path = EXCLUDED.profile_pic_path,
                          last_profile_pic_upload_timestamp = EXCLUDED.last_profile_pic_upload_timestamp
            RETURNING (xmax = 0)
            "#,
        )
        .bind(employee_number)
        .bind(&patch.filename)
        .bind(&patch.path)
        .bind(patch.uploaded_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Matched
        })
    }
}

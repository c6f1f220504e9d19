use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::models::employee::{EmployeeRecord, ProfilePicPatch, UpsertOutcome};
use crate::store::RecordStore;

/// Upserts every record from a JSON array file. Returns `(created, updated)`.
///
/// Profile picture fields are carried over when the record names a file; a
/// missing path falls back to the filename and a missing timestamp to now.
pub async fn seed_employees(store: &dyn RecordStore, path: &Path) -> Result<(usize, usize)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read employee seed file {}", path.display()))?;
    let records: Vec<EmployeeRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Employee seed file {} is not valid", path.display()))?;

    let mut created = 0;
    let mut updated = 0;
    for record in records {
        let number = record.employee_number;
        match store.upsert_attributes(number, record.attributes).await? {
            UpsertOutcome::Created => created += 1,
            _ => updated += 1,
        }

        match record.profile_pic_filename {
            Some(filename) => {
                let patch = ProfilePicPatch {
                    path: record.profile_pic_path.unwrap_or_else(|| filename.clone()),
                    filename,
                    uploaded_at: record
                        .last_profile_pic_upload_timestamp
                        .unwrap_or_else(Utc::now),
                };
                store.upsert_profile_pic(number, &patch, false).await?;
            }
            None if record.profile_pic_path.is_some() => {
                warn!("Seed record {number} has profilePicPath without profilePicFilename; skipped");
            }
            None => {}
        }
    }

    info!(
        "Seeded employees from {}: {created} created, {updated} updated",
        path.display()
    );
    Ok((created, updated))
}

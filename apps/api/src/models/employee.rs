use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An employee document. Attribute fields are schema-less and serialized flat
/// next to `EmployeeNumber` and the profile picture metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    #[serde(rename = "EmployeeNumber")]
    pub employee_number: i64,

    #[serde(
        rename = "profilePicFilename",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_pic_filename: Option<String>,

    #[serde(
        rename = "profilePicPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_pic_path: Option<String>,

    #[serde(
        rename = "lastProfilePicUploadTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_profile_pic_upload_timestamp: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EmployeeRecord {
    pub fn new(employee_number: i64) -> Self {
        Self {
            employee_number,
            profile_pic_filename: None,
            profile_pic_path: None,
            last_profile_pic_upload_timestamp: None,
            attributes: Map::new(),
        }
    }

    pub fn apply(&mut self, patch: &ProfilePicPatch) {
        self.profile_pic_filename = Some(patch.filename.clone());
        self.profile_pic_path = Some(patch.path.clone());
        self.last_profile_pic_upload_timestamp = Some(patch.uploaded_at);
    }
}

/// Fields written by an image upload.
#[derive(Debug, Clone)]
pub struct ProfilePicPatch {
    pub filename: String,
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Result of an upsert keyed by employee number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Matched,
    Created,
    NotFound,
}

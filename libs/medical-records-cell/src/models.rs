use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "jpg", "jpeg", "png"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub file_name: String,
    /// Object path inside the records bucket.
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecordRequest {
    pub patient_id: Uuid,
    pub file_name: String,
    /// MIME type; guessed from the extension when absent.
    pub file_type: Option<String>,
    /// Base64 file content. A `data:...;base64,` prefix is accepted.
    pub content_base64: String,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub description: Option<String>,
    /// Required when an admin uploads on a doctor's behalf.
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    pub record_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub expires_in: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Medical record not found")]
    NotFound,

    #[error("File type .{0} is not allowed")]
    UnsupportedFileType(String),

    #[error("File is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("File content is not valid base64")]
    InvalidPayload,

    #[error("{0}")]
    ValidationError(String),
}

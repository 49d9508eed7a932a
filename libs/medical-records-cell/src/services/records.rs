use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DownloadLink, MedicalRecord, RecordError, UploadRecordRequest, ALLOWED_EXTENSIONS};

/// Strips an optional data-URL prefix and decodes the rest.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, RecordError> {
    let data = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };

    BASE64.decode(data.trim()).map_err(|_| RecordError::InvalidPayload)
}

pub fn extension_of(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn validate_file(file_name: &str, size: usize, limit: usize) -> Result<String, RecordError> {
    let name = file_name.trim();
    if name.is_empty() {
        return Err(RecordError::ValidationError("File name is required".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(RecordError::ValidationError("File name must not contain path separators".to_string()));
    }

    let ext = extension_of(name).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(RecordError::UnsupportedFileType(ext));
    }

    if size == 0 {
        return Err(RecordError::ValidationError("File is empty".to_string()));
    }
    if size > limit {
        return Err(RecordError::TooLarge { size, limit });
    }

    Ok(ext)
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// `{patient_id}/{unix_millis}_{file_name}`
pub fn object_path(patient_id: Uuid, file_name: &str, unix_millis: i64) -> String {
    format!("{}/{}_{}", patient_id, unix_millis, file_name.trim())
}

fn encoded_object_path(file_path: &str) -> String {
    file_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub struct MedicalRecordService {
    supabase: SupabaseClient,
    bucket: String,
    signed_url_ttl_secs: u64,
    max_record_bytes: usize,
}

impl MedicalRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.medical_records_bucket.clone(),
            signed_url_ttl_secs: config.signed_url_ttl_secs,
            max_record_bytes: config.max_record_bytes,
        }
    }

    /// Stores the file in the records bucket, then the `medical_records` row.
    pub async fn upload_record(
        &self,
        request: UploadRecordRequest,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalRecord> {
        debug!("Uploading medical record for patient: {}", request.patient_id);

        let bytes = decode_payload(&request.content_base64)?;
        let ext = validate_file(&request.file_name, bytes.len(), self.max_record_bytes)?;

        let file_type = request
            .file_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| content_type_for(&ext).to_string());
        let file_size = bytes.len() as i64;
        let file_path = object_path(request.patient_id, &request.file_name, Utc::now().timestamp_millis());

        let object_path = encoded_object_path(&file_path);
        self.supabase.upload_object(
            &self.bucket,
            &object_path,
            bytes,
            &file_type,
            auth_token,
        ).await?;
        debug!("Stored object {}", file_path);

        let row = json!({
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "file_name": request.file_name.trim(),
            "file_path": file_path,
            "file_type": file_type,
            "file_size": file_size,
            "type": request.record_type,
            "description": request.description,
        });

        match self.insert_record_row(row, auth_token).await {
            Ok(record) => {
                info!("Medical record {} uploaded for patient {}", record.id, record.patient_id);
                Ok(record)
            }
            Err(e) => {
                warn!("Record row for {} failed, removing stored object: {}", file_path, e);
                if let Err(cleanup) = self.supabase.remove_object(&self.bucket, &object_path, auth_token).await {
                    warn!("Could not remove object {}: {}", file_path, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn insert_record_row(&self, row: Value, auth_token: &str) -> Result<MedicalRecord> {
        let mut rows: Vec<MedicalRecord> = self.supabase
            .insert("medical_records", Some(auth_token), row)
            .await?;

        if rows.is_empty() {
            return Err(anyhow!("Failed to create medical record"));
        }
        Ok(rows.swap_remove(0))
    }

    /// Newest first.
    pub async fn list_records(&self, patient_id: Uuid, auth_token: &str) -> Result<Vec<MedicalRecord>> {
        debug!("Fetching medical records for patient: {}", patient_id);

        let path = format!(
            "/rest/v1/medical_records?patient_id=eq.{}&select=*&order=uploaded_at.desc",
            patient_id
        );

        Ok(self.supabase.request(Method::GET, &path, Some(auth_token), None).await?)
    }

    pub async fn get_record(&self, record_id: Uuid, auth_token: &str) -> Result<MedicalRecord> {
        let path = format!("/rest/v1/medical_records?id=eq.{}&select=*", record_id);

        let mut rows: Vec<MedicalRecord> = self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if rows.is_empty() {
            return Err(RecordError::NotFound.into());
        }
        Ok(rows.swap_remove(0))
    }

    /// Time-limited download link for a stored record.
    pub async fn download_link(&self, record: &MedicalRecord, auth_token: &str) -> Result<DownloadLink> {
        let url = self.supabase.create_signed_url(
            &self.bucket,
            &encoded_object_path(&record.file_path),
            self.signed_url_ttl_secs,
            auth_token,
        ).await?;

        Ok(DownloadLink {
            record_id: record.id,
            file_name: record.file_name.clone(),
            url,
            expires_in: self.signed_url_ttl_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(decode_payload("data:application/pdf;base64,JVBERg==").unwrap(), b"%PDF");
        assert_eq!(decode_payload("JVBERg==").unwrap(), b"%PDF");
        assert_matches!(decode_payload("not base64!"), Err(RecordError::InvalidPayload));
    }

    #[test]
    fn only_whitelisted_extensions() {
        assert_eq!(validate_file("Scan.PDF", 10, 100).unwrap(), "pdf");
        assert_eq!(validate_file("xray.jpeg", 10, 100).unwrap(), "jpeg");
        assert_matches!(validate_file("run.exe", 10, 100), Err(RecordError::UnsupportedFileType(ext)) if ext == "exe");
        assert_matches!(validate_file("noext", 10, 100), Err(RecordError::UnsupportedFileType(_)));
    }

    #[test]
    fn size_and_name_limits() {
        assert_matches!(validate_file("a.pdf", 101, 100), Err(RecordError::TooLarge { size: 101, limit: 100 }));
        assert_matches!(validate_file("a.pdf", 0, 100), Err(RecordError::ValidationError(_)));
        assert_matches!(validate_file("../a.pdf", 1, 100), Err(RecordError::ValidationError(_)));
    }

    #[test]
    fn object_path_layout() {
        let patient = Uuid::parse_str("a7b85492-b672-43ad-989a-1acef574a942").unwrap();
        assert_eq!(
            object_path(patient, "blood test.pdf", 1704877200000),
            "a7b85492-b672-43ad-989a-1acef574a942/1704877200000_blood test.pdf"
        );
        assert_eq!(
            encoded_object_path("a7b85492-b672-43ad-989a-1acef574a942/1704877200000_blood test.pdf"),
            "a7b85492-b672-43ad-989a-1acef574a942/1704877200000_blood%20test.pdf"
        );
    }
}

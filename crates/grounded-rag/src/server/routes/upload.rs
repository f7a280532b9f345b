//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::response::UploadResponse;

/// POST /upload_document - Index an uploaded file (multipart field `file`)
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    if !state.is_ready() {
        return Err(Error::NotInitialized);
    }

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty() && name != "." && name != "..")
            .ok_or_else(|| Error::BadRequest("Uploaded file has no name".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read file data: {}", e)))?;

        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::BadRequest("Missing multipart field 'file'".to_string()))?;

    tracing::info!("Received upload '{}' ({} bytes)", filename, data.len());

    // Per-request directory keeps the original name without collisions
    let scratch = state.uploads_dir().join(Uuid::new_v4().to_string());
    let result = process_upload(&state, &scratch, &filename, &data).await;

    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
        tracing::warn!("Failed to clean up {}: {}", scratch.display(), e);
    }

    match result {
        Ok(true) => Ok(Json(UploadResponse {
            message: format!("Document '{}' uploaded and processed successfully.", filename),
        })),
        Ok(false) => Err(Error::Ingestion(format!(
            "Failed to process document '{}'.",
            filename
        ))),
        Err(e) if e.is_not_initialized() => Err(e),
        Err(e) => Err(Error::Ingestion(format!(
            "Error uploading or processing file: {}",
            e
        ))),
    }
}

async fn process_upload(
    state: &AppState,
    scratch: &Path,
    filename: &str,
    data: &[u8],
) -> Result<bool> {
    tokio::fs::create_dir_all(scratch).await?;

    let path: PathBuf = scratch.join(filename);
    tokio::fs::write(&path, data).await?;

    // Cite the upload location, not the scratch copy that is about to be removed
    let source = state.uploads_dir().join(filename);
    state
        .pipeline()
        .add_document_with_source(&path, &source.to_string_lossy())
        .await
}

/// Keep only the final path component of a client-supplied name
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("dir/"), "");
    }
}

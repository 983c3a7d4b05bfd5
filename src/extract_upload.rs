use axum::extract::Multipart;
use tracing::debug;

use crate::error::{ApiError, PipelineError};

/// One file part pulled out of the multipart request, in arrival order.
pub struct RawUpload {
    pub original_name: String,
    pub data: Vec<u8>,
}

/// Collects all file parts from the `heicFiles` multipart field.
///
/// Non-file fields and unrelated field names are ignored. Returns a 400
/// error when the request carries no usable file parts.
pub async fn collect_uploads(mut multipart: Multipart) -> Result<Vec<RawUpload>, ApiError> {
    let mut uploads = Vec::new();
    let mut ignored_fields = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart request: {e}")))?
    {
        if field.name() != Some("heicFiles") {
            let field_name = field.name().unwrap_or("unnamed").to_string();
            debug!("Ignoring multipart field: {}", field_name);
            ignored_fields += 1;
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload_{}", uploads.len()));
        let content_type = field.content_type().map(str::to_string);
        debug!(
            "Received file '{}' with content type: {:?}",
            original_name, content_type
        );

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {e}")))?
            .to_vec();
        if data.is_empty() {
            debug!("Skipping empty file part '{}'", original_name);
            continue;
        }

        uploads.push(RawUpload {
            original_name,
            data,
        });
    }

    if ignored_fields > 0 {
        debug!(
            "Ignored {} non-file fields in multipart request",
            ignored_fields
        );
    }

    if uploads.is_empty() {
        return Err(ApiError::from(PipelineError::NoFiles));
    }
    Ok(uploads)
}

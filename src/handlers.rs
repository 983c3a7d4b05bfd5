// Request handler for the upload -> convert -> compose pipeline.

use crate::{
    app::SharedIntake,
    compose::PdfBuilder,
    convert,
    error::{ApiError, PipelineError},
    extract_upload::{RawUpload, collect_uploads},
    intake::StoredUpload,
};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

// --- POST /upload ---
// Accepts 1..N files in the `heicFiles` multipart field and responds with a
// single PDF, one page per file in arrival order. Any per-file failure aborts
// the whole request; no partial document is ever returned.
pub async fn upload_pdf(
    State(intake): State<SharedIntake>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploads = collect_uploads(multipart).await?;
    info!("Upload request received: {} file(s)", uploads.len());

    let mut stored = Vec::with_capacity(uploads.len());
    let result = run_pipeline(&intake, &uploads, &mut stored).await;

    // Transient inputs are released on every exit path, success or failure.
    for upload in &stored {
        intake.remove(upload).await;
    }

    let pdf_bytes = result.map_err(|e| {
        error!("Upload request aborted: {}", e);
        ApiError::from(e)
    })?;

    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let filename = format!("converted_files_{}.pdf", epoch_ms);
    info!(
        "Upload request complete: responding with {} byte PDF as '{}'",
        pdf_bytes.len(),
        filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf_bytes,
    )
        .into_response())
}

// Files are processed strictly sequentially so page order matches upload
// order. `stored` is an out parameter so the caller can clean up whatever
// was stored before a mid-pipeline failure.
async fn run_pipeline(
    intake: &SharedIntake,
    uploads: &[RawUpload],
    stored: &mut Vec<StoredUpload>,
) -> Result<Vec<u8>, PipelineError> {
    for upload in uploads {
        stored.push(intake.store(&upload.original_name, &upload.data).await?);
    }

    let mut builder = PdfBuilder::new();
    for upload in stored.iter() {
        let bytes = intake.fetch(upload).await?;
        let jpeg = if intake.transcodes_on_store() {
            // Backend already transcoded on ingest; verify rather than trust.
            convert::ensure_jpeg(bytes, &upload.original_name)?
        } else {
            convert::to_jpeg(&bytes, &upload.original_name)?
        };
        builder.add_page(&jpeg, &upload.original_name)?;
    }

    builder.finish()
}

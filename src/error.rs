// Error types for the upload pipeline and the HTTP edge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures inside the upload -> convert -> compose pipeline.
///
/// Any variant other than `NoFiles` aborts the whole request; there is no
/// partial-success mode. Variants carry the original filename of the upload
/// that triggered them so it can be logged server-side.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no files were uploaded")]
    NoFiles,
    #[error("failed to store upload '{name}': {source}")]
    Intake {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to store upload '{name}' in blob store: {message}")]
    RemoteIntake { name: String, message: String },
    #[error("failed to fetch stored upload '{name}': {message}")]
    Fetch { name: String, message: String },
    #[error("failed to convert '{name}' to JPEG: {source}")]
    Conversion {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to add page for '{name}': {message}")]
    Compose { name: String, message: String },
    #[error("failed to serialize PDF document: {0}")]
    Delivery(String),
}

/// HTTP error responses for the API server.
///
/// Bodies are short plaintext messages; the detailed cause is only ever
/// logged server-side, never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::NoFiles => Self::BadRequest("No files were uploaded.".to_string()),
            PipelineError::Delivery(_) => {
                Self::InternalServerError("Error downloading file.".to_string())
            }
            _ => Self::InternalServerError("Error during file processing.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_maps_to_bad_request() {
        let api_error = ApiError::from(PipelineError::NoFiles);
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conversion_error_maps_to_internal_server_error() {
        let source = image::ImageError::Unsupported(
            image::error::UnsupportedError::from_format_and_kind(
                image::error::ImageFormatHint::Unknown,
                image::error::UnsupportedErrorKind::GenericFeature("heic".to_string()),
            ),
        );
        let api_error = ApiError::from(PipelineError::Conversion {
            name: "IMG_0001.HEIC".to_string(),
            source,
        });
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

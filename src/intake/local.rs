// Local filesystem intake backend.

use super::StoredUpload;
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Stores uploads as UUID-named files under a spool directory. Files live
/// only for the duration of one request; the handler removes them on every
/// exit path.
pub struct LocalIntake {
    uploads_dir: PathBuf,
}

impl LocalIntake {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let uploads_dir = uploads_dir.into();
        std::fs::create_dir_all(&uploads_dir)?;
        Ok(LocalIntake { uploads_dir })
    }

    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredUpload, PipelineError> {
        let path = self.uploads_dir.join(Uuid::new_v4().to_string());
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| PipelineError::Intake {
                name: original_name.to_string(),
                source,
            })?;

        debug!("Stored '{}' at {}", original_name, path.display());
        Ok(StoredUpload {
            location: path.to_string_lossy().into_owned(),
            original_name: original_name.to_string(),
        })
    }

    pub async fn fetch(&self, upload: &StoredUpload) -> Result<Vec<u8>, PipelineError> {
        tokio::fs::read(Path::new(&upload.location))
            .await
            .map_err(|e| PipelineError::Fetch {
                name: upload.original_name.clone(),
                message: e.to_string(),
            })
    }

    pub async fn remove(&self, upload: &StoredUpload) {
        if let Err(e) = tokio::fs::remove_file(Path::new(&upload.location)).await {
            warn!(
                "Failed to remove stored upload '{}' ({}): {}",
                upload.original_name, upload.location, e
            );
        }
    }
}

// Transient storage for uploaded files.
//
// Two interchangeable backends behind one dispatch enum: the local filesystem
// and a remote HTTP blob store. Selected once at startup from configuration.

mod local;
mod remote;

pub use local::LocalIntake;
pub use remote::{RemoteIntake, RemoteStorageConfig};

use crate::error::PipelineError;

/// A stored upload, addressable by an opaque location: a filesystem path for
/// the local backend, a fetchable URL for the remote one.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub location: String,
    pub original_name: String,
}

pub enum IntakeProvider {
    Local(LocalIntake),
    Remote(RemoteIntake),
}

impl IntakeProvider {
    /// Stores one uploaded file transiently and returns a handle to it.
    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredUpload, PipelineError> {
        match self {
            IntakeProvider::Local(intake) => intake.store(original_name, data).await,
            IntakeProvider::Remote(intake) => intake.store(original_name, data).await,
        }
    }

    /// Reads a stored upload back as bytes.
    pub async fn fetch(&self, upload: &StoredUpload) -> Result<Vec<u8>, PipelineError> {
        match self {
            IntakeProvider::Local(intake) => intake.fetch(upload).await,
            IntakeProvider::Remote(intake) => intake.fetch(upload).await,
        }
    }

    /// Deletes a stored upload. Best effort; failures are logged, not
    /// propagated, so cleanup never masks the request outcome.
    pub async fn remove(&self, upload: &StoredUpload) {
        match self {
            IntakeProvider::Local(intake) => intake.remove(upload).await,
            IntakeProvider::Remote(intake) => intake.remove(upload).await,
        }
    }

    /// Whether the backend transcodes uploads to JPEG as part of storing
    /// them. When true, fetched bytes skip in-process decoding.
    pub fn transcodes_on_store(&self) -> bool {
        matches!(self, IntakeProvider::Remote(_))
    }
}

// Remote blob store intake backend.
//
// The store transcodes every upload to JPEG on ingest (`format=jpeg`), so
// fetching a stored object yields already-converted bytes.

use super::StoredUpload;
use crate::error::PipelineError;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

/// Remote blob store credentials and endpoint, loaded once at startup and
/// passed by reference into the intake provider. Request logic never reads
/// ambient configuration.
#[derive(Debug, Clone)]
pub struct RemoteStorageConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize)]
struct StoreObjectResponse {
    url: String,
    public_id: String,
}

pub struct RemoteIntake {
    config: RemoteStorageConfig,
    client: reqwest::Client,
}

impl RemoteIntake {
    pub fn new(config: RemoteStorageConfig) -> Self {
        RemoteIntake {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn upload_endpoint(&self) -> String {
        format!(
            "{}/{}/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    fn object_endpoint(&self, public_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            public_id
        )
    }

    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredUpload, PipelineError> {
        let remote_error = |message: String| PipelineError::RemoteIntake {
            name: original_name.to_string(),
            message,
        };

        let public_id = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(self.upload_endpoint())
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[
                ("format", "jpeg"),
                ("folder", "upload"),
                ("public_id", public_id.as_str()),
            ])
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| remote_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| remote_error(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| remote_error(e.to_string()))?;
        let stored: StoreObjectResponse = serde_json::from_slice(&body)
            .map_err(|e| remote_error(format!("invalid store response: {e}")))?;

        debug!(
            "Stored '{}' in blob store as '{}' ({})",
            original_name, stored.public_id, stored.url
        );
        Ok(StoredUpload {
            location: stored.url,
            original_name: original_name.to_string(),
        })
    }

    pub async fn fetch(&self, upload: &StoredUpload) -> Result<Vec<u8>, PipelineError> {
        let fetch_error = |message: String| PipelineError::Fetch {
            name: upload.original_name.clone(),
            message,
        };

        let response = self
            .client
            .get(&upload.location)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    pub async fn remove(&self, upload: &StoredUpload) {
        // The public id is the last path segment of the stored object's URL.
        let public_id = upload
            .location
            .rsplit('/')
            .next()
            .unwrap_or(&upload.location);

        let result = self
            .client
            .delete(self.object_endpoint(public_id))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            warn!(
                "Failed to remove stored upload '{}' from blob store: {}",
                upload.original_name, e
            );
        }
    }
}

//! HTTP client for the platform's recording store.
//!
//! The store is a flat object space addressed by key; call recordings land
//! under a configured prefix with the contact id embedded in the key.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ObjectStore;

/// Configuration for the recording store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStoreConfig {
    /// Base URL of the object API
    pub api_url: String,

    /// Bearer token
    pub api_token: String,

    /// Prefix call recordings are written under
    pub recording_prefix: String,
}

/// Recording store API client.
pub struct RecordingStoreClient {
    config: RecordingStoreConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    objects: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    key: String,
}

impl RecordingStoreClient {
    pub fn new(config: RecordingStoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/objects/{}",
            self.config.api_url.trim_end_matches('/'),
            key
        )
    }
}

#[async_trait]
impl ObjectStore for RecordingStoreClient {
    async fn list_keys(&self) -> Result<Vec<String>> {
        let url = format!(
            "{}/objects?prefix={}",
            self.config.api_url.trim_end_matches('/'),
            self.config.recording_prefix
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .context("Failed to list recording store objects")?
            .error_for_status()
            .context("Recording store rejected list request")?;

        let listing: ListObjectsResponse = response
            .json()
            .await
            .context("Failed to parse object listing")?;

        Ok(listing.objects.into_iter().map(|o| o.key).collect())
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        let response = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .with_context(|| format!("Failed to download object {}", key))?
            .error_for_status()
            .with_context(|| format!("Recording store rejected download of {}", key))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", key))?;

        tokio::fs::write(dest, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<()> {
        let bytes = tokio::fs::read(src)
            .await
            .with_context(|| format!("Failed to read {}", src.display()))?;

        self.client
            .put(self.object_url(key))
            .bearer_auth(&self.config.api_token)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Failed to upload object {}", key))?
            .error_for_status()
            .with_context(|| format!("Recording store rejected upload of {}", key))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete(self.object_url(key))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .with_context(|| format!("Failed to delete object {}", key))?
            .error_for_status()
            .with_context(|| format!("Recording store rejected delete of {}", key))?;

        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        self.object_url(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_building() {
        let client = RecordingStoreClient::new(RecordingStoreConfig {
            api_url: "https://store.example.com/v1/".to_string(),
            api_token: "token".to_string(),
            recording_prefix: "recordings/".to_string(),
        });

        assert_eq!(
            client.object_url("recordings/contact-1.wav"),
            "https://store.example.com/v1/objects/recordings/contact-1.wav"
        );
        assert_eq!(
            client.object_uri("temp-transcribe/x.wav"),
            "https://store.example.com/v1/objects/temp-transcribe/x.wav"
        );
    }
}

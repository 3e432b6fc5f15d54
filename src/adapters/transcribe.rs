//! HTTP client for the asynchronous transcription service.
//!
//! Jobs are submitted with a media URI and a language code, polled by name,
//! and deleted once their result has been consumed. A completed job exposes
//! a transcript URI whose JSON body carries ordered audio segments.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{JobState, TranscriptionService};

/// Configuration for the transcription client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    /// Base URL of the transcription API
    pub api_url: String,

    /// Bearer token
    pub api_token: String,

    /// Language code submitted with each job (e.g. "es-ES")
    pub language_code: String,
}

/// Transcription service API client.
pub struct TranscribeClient {
    config: TranscribeConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct StartJobRequest<'a> {
    job_name: &'a str,
    media_uri: &'a str,
    media_format: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    transcript_uri: Option<String>,
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptBody {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    #[serde(default)]
    audio_segments: Vec<AudioSegment>,
}

#[derive(Debug, Deserialize)]
struct AudioSegment {
    #[serde(default)]
    transcript: String,
}

impl TranscribeClient {
    pub fn new(config: TranscribeConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn language_code(&self) -> &str {
        &self.config.language_code
    }

    fn job_url(&self, job_name: &str) -> String {
        format!(
            "{}/jobs/{}",
            self.config.api_url.trim_end_matches('/'),
            job_name
        )
    }
}

#[async_trait]
impl TranscriptionService for TranscribeClient {
    async fn start_job(&self, job_name: &str, media_uri: &str, language_code: &str) -> Result<()> {
        let request = StartJobRequest {
            job_name,
            media_uri,
            media_format: "wav",
            language_code,
        };

        self.client
            .post(format!(
                "{}/jobs",
                self.config.api_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to submit transcription job {}", job_name))?
            .error_for_status()
            .with_context(|| format!("Transcription service rejected job {}", job_name))?;

        Ok(())
    }

    async fn job_state(&self, job_name: &str) -> Result<JobState> {
        let response = self
            .client
            .get(self.job_url(job_name))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .with_context(|| format!("Failed to query transcription job {}", job_name))?
            .error_for_status()
            .with_context(|| format!("Transcription service rejected status query for {}", job_name))?;

        let status: JobStatusResponse = response
            .json()
            .await
            .context("Failed to parse job status")?;

        let state = match status.status.as_str() {
            "COMPLETED" => JobState::Completed {
                transcript_uri: status
                    .transcript_uri
                    .context("Completed job carries no transcript URI")?,
            },
            "FAILED" => JobState::Failed {
                reason: status.failure_reason.unwrap_or_default(),
            },
            "QUEUED" | "SUBMITTED" => JobState::Submitted,
            _ => JobState::Running,
        };

        Ok(state)
    }

    async fn fetch_segments(&self, transcript_uri: &str) -> Result<Vec<String>> {
        let body: TranscriptBody = self
            .client
            .get(transcript_uri)
            .send()
            .await
            .context("Failed to fetch transcript")?
            .error_for_status()
            .context("Transcript fetch rejected")?
            .json()
            .await
            .context("Failed to parse transcript body")?;

        Ok(body
            .results
            .audio_segments
            .into_iter()
            .map(|s| s.transcript)
            .collect())
    }

    async fn delete_job(&self, job_name: &str) -> Result<()> {
        self.client
            .delete(self.job_url(job_name))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .with_context(|| format!("Failed to delete transcription job {}", job_name))?
            .error_for_status()
            .with_context(|| format!("Transcription service rejected delete of {}", job_name))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_body_parsing() {
        let json = r#"{
            "results": {
                "audio_segments": [
                    {"transcript": "Hola?"},
                    {"transcript": "Bien"}
                ]
            }
        }"#;

        let body: TranscriptBody = serde_json::from_str(json).unwrap();
        let segments: Vec<String> = body
            .results
            .audio_segments
            .into_iter()
            .map(|s| s.transcript)
            .collect();

        assert_eq!(segments, vec!["Hola?", "Bien"]);
    }

    #[test]
    fn test_job_url_building() {
        let client = TranscribeClient::new(TranscribeConfig {
            api_url: "https://stt.example.com/v1".to_string(),
            api_token: "token".to_string(),
            language_code: "es-ES".to_string(),
        });

        assert_eq!(
            client.job_url("transcribe-c1-1700000000"),
            "https://stt.example.com/v1/jobs/transcribe-c1-1700000000"
        );
    }
}

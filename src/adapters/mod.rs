//! Adapter interfaces for the external services the orchestrator drives.
//!
//! Three collaborators sit behind traits so the polling loops can be
//! exercised against injected fakes:
//! - `TelephonyGateway`: outbound calls and per-contact attributes
//! - `ObjectStore`: the recording store (list/download/upload/delete)
//! - `TranscriptionService`: asynchronous speech-to-text jobs
//!
//! Gateway operations are thin network calls: they report failure through
//! return values and are never retried here. Retry policy belongs to the
//! callers.

pub mod storage;
pub mod transcribe;
pub mod voice;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use storage::RecordingStoreClient;
pub use transcribe::TranscribeClient;
pub use voice::VoicePlatformClient;

/// Contact attribute holding the text the flow speaks next.
pub const ATTR_PROMPT: &str = "NovaPrompt";

/// Contact attribute the flow sets (via DTMF) when the interviewee is ready
/// for the next question. Any non-empty value counts; cleared by writing "".
pub const ATTR_USER_RESPONSE: &str = "userResponse";

/// Outbound call placement failure.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("voice platform rejected the call: {0}")]
    Rejected(String),

    #[error("voice platform unreachable: {0}")]
    Transport(String),
}

/// Result of a contact status query.
#[derive(Debug, Clone)]
pub struct ContactStatus {
    /// Whether the call is still up. Query failures report `true` so a
    /// transient describe error never tears down a live interview.
    pub active: bool,

    /// Platform state string, when one was returned
    pub state: Option<String>,
}

/// Telephony platform operations keyed by contact id.
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    /// Place an outbound call. The opening prompt is spoken as soon as the
    /// contact answers and carries the first interview question.
    async fn place_call(
        &self,
        phone_number: &str,
        context: &str,
        opening_prompt: &str,
    ) -> Result<String, CallError>;

    /// Read the contact's attribute map. Failures surface as an empty map;
    /// the delivery loop treats that as "no acknowledgement yet".
    async fn read_attributes(&self, contact_id: &str) -> HashMap<String, String>;

    /// Write one attribute. Returns false on failure; never retried here.
    async fn write_attribute(&self, contact_id: &str, key: &str, value: &str) -> bool;

    /// Query whether the contact is still active.
    async fn query_status(&self, contact_id: &str) -> ContactStatus;

    /// Stop the contact. Returns false on failure.
    async fn terminate(&self, contact_id: &str) -> bool;
}

/// The recording store: a flat keyed object space under one prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every key under the store's recording prefix.
    async fn list_keys(&self) -> Result<Vec<String>>;

    async fn download(&self, key: &str, dest: &Path) -> Result<()>;

    async fn upload(&self, src: &Path, key: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Addressable URI for a key, as handed to the transcription service.
    fn object_uri(&self, key: &str) -> String;
}

/// Terminal and in-flight states of a transcription job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Accepted but not yet running
    Submitted,

    Running,

    /// Finished; the transcript can be fetched from the given URI
    Completed { transcript_uri: String },

    Failed { reason: String },
}

/// Asynchronous speech-to-text service.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn start_job(&self, job_name: &str, media_uri: &str, language_code: &str) -> Result<()>;

    async fn job_state(&self, job_name: &str) -> Result<JobState>;

    /// Fetch the finished transcript's segments in original order.
    async fn fetch_segments(&self, transcript_uri: &str) -> Result<Vec<String>>;

    async fn delete_job(&self, job_name: &str) -> Result<()>;
}

//! Recording retrieval and transcription pipeline.
//!
//! Two bounded polling phases, each under its own wall-clock ceiling:
//! discovery of the call recording in the object store, then completion of
//! the asynchronous transcription job. Whatever the outcome, the temporary
//! transcription input copy and the job handle are removed before the
//! pipeline returns.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{JobState, ObjectStore, TranscriptionService};

/// Transcript substituted when the transcription job reports failure.
pub const TRANSCRIPTION_FAILED: &str = "Falló la transcripción";

/// Transcript substituted when the job does not finish within its ceiling.
pub const TRANSCRIPTION_TIMEOUT: &str = "Timeout en transcripción";

/// Timing knobs for both polling phases.
#[derive(Debug, Clone)]
pub struct RetrievalTiming {
    /// Budget for finding the recording in the store
    pub discovery_ceiling: Duration,

    /// Budget for the transcription job to finish
    pub transcription_ceiling: Duration,

    /// Sleep between poll attempts, shared by both phases
    pub poll_interval: Duration,
}

/// Outcome of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    /// A recording was found and transcribed
    Complete { transcript: String, audio_ref: String },

    /// A recording was found but no transcript could be produced; the
    /// sentinel stands in for the transcript downstream
    Degraded { sentinel: String },

    /// No recording for the contact appeared within the discovery ceiling
    RecordingNotFound,
}

/// Terminal states of the transcription wait.
enum JobOutcome {
    Transcribed(String),
    Failed,
    TimedOut,
}

/// Locate the contact's recording, transcribe it, and return plain text.
///
/// Failures inside the transcription phase degrade to a sentinel instead of
/// propagating, so document generation downstream always has an outcome to
/// work with.
pub async fn fetch_and_transcribe(
    store: &dyn ObjectStore,
    transcriber: &dyn TranscriptionService,
    contact_id: &str,
    language_code: &str,
    timing: &RetrievalTiming,
) -> Retrieval {
    let Some(key) = discover_recording(store, contact_id, timing).await else {
        return Retrieval::RecordingNotFound;
    };

    info!(contact_id, %key, "Recording located");

    let audio_ref = store.object_uri(&key);
    let temp_key = format!("temp-transcribe/{}_{}.wav", contact_id, Uuid::new_v4());
    let job_name = format!("transcribe-{}-{}", contact_id, Utc::now().timestamp());

    let outcome = submit_and_wait(
        store,
        transcriber,
        contact_id,
        &key,
        &temp_key,
        &job_name,
        language_code,
        timing,
    )
    .await;

    // Runs on every terminal outcome, error exits included.
    cleanup(store, transcriber, &temp_key, &job_name).await;

    match outcome {
        Ok(JobOutcome::Transcribed(transcript)) => Retrieval::Complete {
            transcript,
            audio_ref,
        },
        Ok(JobOutcome::Failed) => Retrieval::Degraded {
            sentinel: TRANSCRIPTION_FAILED.to_string(),
        },
        Ok(JobOutcome::TimedOut) => Retrieval::Degraded {
            sentinel: TRANSCRIPTION_TIMEOUT.to_string(),
        },
        Err(e) => {
            warn!(contact_id, error = %e, "Transcription pipeline errored");
            Retrieval::Degraded {
                sentinel: format!("Error en transcripción: {}", e),
            }
        }
    }
}

/// Poll the store for an object whose key contains the contact id and has
/// the recording extension. Listing failures count as "not there yet".
async fn discover_recording(
    store: &dyn ObjectStore,
    contact_id: &str,
    timing: &RetrievalTiming,
) -> Option<String> {
    let start = Instant::now();

    while start.elapsed() < timing.discovery_ceiling {
        match store.list_keys().await {
            Ok(keys) => {
                if let Some(key) = keys
                    .into_iter()
                    .find(|k| k.contains(contact_id) && k.ends_with(".wav"))
                {
                    return Some(key);
                }
                debug!(contact_id, "Recording not in store yet");
            }
            Err(e) => warn!(contact_id, error = %e, "Recording store listing failed"),
        }

        tokio::time::sleep(timing.poll_interval).await;
    }

    warn!(contact_id, "Recording did not appear within the discovery ceiling");
    None
}

/// Stage the audio for transcription, submit the job and wait for a
/// terminal state.
#[allow(clippy::too_many_arguments)]
async fn submit_and_wait(
    store: &dyn ObjectStore,
    transcriber: &dyn TranscriptionService,
    contact_id: &str,
    recording_key: &str,
    temp_key: &str,
    job_name: &str,
    language_code: &str,
    timing: &RetrievalTiming,
) -> Result<JobOutcome> {
    let staging = tempfile::tempdir().context("Failed to create staging directory")?;
    let local = staging.path().join(format!("recording_{}.wav", contact_id));

    store
        .download(recording_key, &local)
        .await
        .context("Failed to download recording")?;

    store
        .upload(&local, temp_key)
        .await
        .context("Failed to stage transcription input")?;

    transcriber
        .start_job(job_name, &store.object_uri(temp_key), language_code)
        .await
        .context("Failed to submit transcription job")?;

    info!(job_name, "Transcription job submitted");

    let start = Instant::now();
    while start.elapsed() < timing.transcription_ceiling {
        match transcriber.job_state(job_name).await {
            Ok(JobState::Completed { transcript_uri }) => {
                let segments = transcriber
                    .fetch_segments(&transcript_uri)
                    .await
                    .context("Failed to fetch transcript segments")?;
                return Ok(JobOutcome::Transcribed(segments.join("\n")));
            }
            Ok(JobState::Failed { reason }) => {
                warn!(job_name, %reason, "Transcription job failed");
                return Ok(JobOutcome::Failed);
            }
            Ok(_) => debug!(job_name, "Transcription job still running"),
            Err(e) => warn!(job_name, error = %e, "Job status query failed"),
        }

        tokio::time::sleep(timing.poll_interval).await;
    }

    warn!(job_name, "Transcription job did not finish within the ceiling");
    Ok(JobOutcome::TimedOut)
}

/// Remove the temporary transcription input and the job handle. Failures
/// are logged and swallowed; there is nothing useful to do with them.
async fn cleanup(
    store: &dyn ObjectStore,
    transcriber: &dyn TranscriptionService,
    temp_key: &str,
    job_name: &str,
) {
    if let Err(e) = store.delete(temp_key).await {
        warn!(temp_key, error = %e, "Could not delete temporary transcription input");
    }
    if let Err(e) = transcriber.delete_job(job_name).await {
        warn!(job_name, error = %e, "Could not delete transcription job");
    }
}

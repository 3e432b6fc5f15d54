//! Retrieval Pipeline Integration Tests
//!
//! Exercises recording discovery, transcription polling and the guaranteed
//! cleanup of the temporary input copy and the job handle.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use callscribe::adapters::{JobState, ObjectStore, TranscriptionService};
use callscribe::core::{
    fetch_and_transcribe, Retrieval, RetrievalTiming, TRANSCRIPTION_FAILED, TRANSCRIPTION_TIMEOUT,
};

/// In-memory object store. The recording can be held back for the first
/// few listings to exercise the discovery polling.
struct FakeStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    hide_for_lists: Mutex<usize>,
}

impl FakeStore {
    fn with_recording(key: &str) -> Self {
        let mut objects = HashMap::new();
        objects.insert(key.to_string(), b"RIFFaudio".to_vec());
        Self {
            objects: Mutex::new(objects),
            hide_for_lists: Mutex::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            hide_for_lists: Mutex::new(0),
        }
    }

    fn hidden_for(self, lists: usize) -> Self {
        *self.hide_for_lists.lock().unwrap() = lists;
        self
    }

    fn temp_keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with("temp-transcribe/"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut hidden = self.hide_for_lists.lock().unwrap();
        if *hidden > 0 {
            *hidden -= 1;
            return Ok(Vec::new());
        }
        Ok(self.objects.lock().unwrap().keys().cloned().collect())
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such object: {}", key))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<()> {
        let bytes = tokio::fs::read(src).await?;
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("store://{}", key)
    }
}

/// Transcriber that walks through a scripted sequence of job states (the
/// last one repeats) and records job deletions.
struct FakeTranscriber {
    states: Mutex<Vec<JobState>>,
    segments: Vec<String>,
    fail_fetch: bool,
    started_jobs: Mutex<Vec<String>>,
    deleted_jobs: Mutex<Vec<String>>,
}

impl FakeTranscriber {
    fn with_states(states: Vec<JobState>, segments: Vec<&str>) -> Self {
        Self {
            states: Mutex::new(states),
            segments: segments.into_iter().map(String::from).collect(),
            fail_fetch: false,
            started_jobs: Mutex::new(Vec::new()),
            deleted_jobs: Mutex::new(Vec::new()),
        }
    }

    fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted_jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionService for FakeTranscriber {
    async fn start_job(&self, job_name: &str, _media_uri: &str, _language_code: &str) -> Result<()> {
        self.started_jobs.lock().unwrap().push(job_name.to_string());
        Ok(())
    }

    async fn job_state(&self, _job_name: &str) -> Result<JobState> {
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            Ok(states.remove(0))
        } else {
            Ok(states[0].clone())
        }
    }

    async fn fetch_segments(&self, _transcript_uri: &str) -> Result<Vec<String>> {
        if self.fail_fetch {
            anyhow::bail!("transcript endpoint unreachable");
        }
        Ok(self.segments.clone())
    }

    async fn delete_job(&self, job_name: &str) -> Result<()> {
        self.deleted_jobs.lock().unwrap().push(job_name.to_string());
        Ok(())
    }
}

fn fast_timing() -> RetrievalTiming {
    RetrievalTiming {
        discovery_ceiling: Duration::from_millis(200),
        transcription_ceiling: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
    }
}

const RECORDING_KEY: &str = "recordings/2025/abc-contact-9.wav";

#[tokio::test]
async fn test_completed_job_yields_joined_segments() {
    let store = FakeStore::with_recording(RECORDING_KEY).hidden_for(2);
    let transcriber = FakeTranscriber::with_states(
        vec![
            JobState::Submitted,
            JobState::Running,
            JobState::Completed {
                transcript_uri: "store://transcripts/abc.json".to_string(),
            },
        ],
        vec!["Hola?", "Bien", "¿Qué proyecto lideraste?", "El proyecto X"],
    );

    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;

    match retrieval {
        Retrieval::Complete {
            transcript,
            audio_ref,
        } => {
            assert_eq!(
                transcript,
                "Hola?\nBien\n¿Qué proyecto lideraste?\nEl proyecto X"
            );
            assert_eq!(audio_ref, format!("store://{}", RECORDING_KEY));
        }
        other => panic!("expected Complete, got {:?}", other),
    }

    // One job was submitted; temporary input copy and job handle are gone.
    assert_eq!(transcriber.started_jobs.lock().unwrap().len(), 1);
    assert!(store.temp_keys().is_empty());
    assert_eq!(transcriber.deleted().len(), 1);
}

#[tokio::test]
async fn test_job_never_completing_yields_timeout_sentinel_and_cleanup() {
    let store = FakeStore::with_recording(RECORDING_KEY);
    let transcriber = FakeTranscriber::with_states(vec![JobState::Running], vec![]);

    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;

    assert_eq!(
        retrieval,
        Retrieval::Degraded {
            sentinel: TRANSCRIPTION_TIMEOUT.to_string()
        }
    );

    assert!(store.temp_keys().is_empty());
    assert_eq!(transcriber.deleted().len(), 1);
}

#[tokio::test]
async fn test_failed_job_yields_failure_sentinel_and_cleanup() {
    let store = FakeStore::with_recording(RECORDING_KEY);
    let transcriber = FakeTranscriber::with_states(
        vec![
            JobState::Running,
            JobState::Failed {
                reason: "bad audio".to_string(),
            },
        ],
        vec![],
    );

    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;

    assert_eq!(
        retrieval,
        Retrieval::Degraded {
            sentinel: TRANSCRIPTION_FAILED.to_string()
        }
    );

    assert!(store.temp_keys().is_empty());
    assert_eq!(transcriber.deleted().len(), 1);
}

#[tokio::test]
async fn test_missing_recording_times_out_discovery() {
    let store = FakeStore::empty();
    let transcriber = FakeTranscriber::with_states(vec![JobState::Running], vec![]);

    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;

    assert_eq!(retrieval, Retrieval::RecordingNotFound);
    // Nothing was staged, so nothing to clean up.
    assert!(transcriber.deleted().is_empty());
}

#[tokio::test]
async fn test_error_exit_still_cleans_up() {
    // Fetching the finished transcript fails; the pipeline degrades to an
    // error sentinel but the temp object and job are removed regardless.
    let store = FakeStore::with_recording(RECORDING_KEY);
    let transcriber = FakeTranscriber::with_states(
        vec![JobState::Completed {
            transcript_uri: "store://transcripts/abc.json".to_string(),
        }],
        vec![],
    )
    .failing_fetch();

    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;

    match retrieval {
        Retrieval::Degraded { sentinel } => {
            assert!(sentinel.starts_with("Error en transcripción"));
        }
        other => panic!("expected Degraded with error sentinel, got {:?}", other),
    }

    assert!(store.temp_keys().is_empty());
    assert_eq!(transcriber.deleted().len(), 1);
}

#[tokio::test]
async fn test_recording_matched_by_contact_id_and_extension() {
    let store = FakeStore::empty();
    store
        .objects
        .lock()
        .unwrap()
        .insert("recordings/contact-9.json".to_string(), vec![1]);
    store
        .objects
        .lock()
        .unwrap()
        .insert("recordings/other-contact.wav".to_string(), vec![1]);

    let transcriber = FakeTranscriber::with_states(vec![JobState::Running], vec![]);

    // Neither key matches contact id + extension together.
    let retrieval =
        fetch_and_transcribe(&store, &transcriber, "contact-9", "es-ES", &fast_timing()).await;
    assert_eq!(retrieval, Retrieval::RecordingNotFound);
}

//! Session lifecycle controller.
//!
//! Top-level orchestration of one interview: validate and cap the question
//! list, place the call with question #1 riding in the opening prompt, wait
//! out call establishment, hand off to the delivery loop, and regardless of
//! what the loop achieved, terminate the call, retrieve and transcribe the
//! recording, and build the knowledge documents. The consolidated result is
//! recorded through the session handle before it is returned.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{ObjectStore, TelephonyGateway, TranscriptionService};
use crate::domain::{InterviewResult, SessionStatus};
use crate::knowledge::{self, extractor};

use super::delivery::{run_delivery_loop, DeliveryOutcome, DeliveryTiming};
use super::registry::SessionHandle;
use super::retrieval::{fetch_and_transcribe, Retrieval, RetrievalTiming};

/// Fixed greeting spoken when the contact answers; the first question is
/// appended to it so delivery starts with slot #1 already filled.
pub const OPENING_PROMPT: &str = "Hola, soy el asistente de IA para recopilar información \
    de tus proyectos. La llamada será grabada para poder almacenar el conocimiento que nos \
    transmitas. ¿Es un buen momento para iniciar?";

/// Transcript substituted when no recording appeared within the discovery
/// ceiling, so document generation still runs.
pub const RECORDING_UNAVAILABLE: &str = "Grabación no disponible";

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct InterviewSettings {
    /// Questions beyond this cap are silently dropped
    pub max_questions: usize,

    /// Language code handed to the transcription service
    pub language_code: String,

    /// Where knowledge documents are written
    pub output_dir: PathBuf,

    /// Fixed wait after call placement before trusting the status query
    pub grace_wait: Duration,

    /// One extra wait when the first status check is not yet active
    pub grace_recheck: Duration,

    pub delivery: DeliveryTiming,
    pub retrieval: RetrievalTiming,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            max_questions: 4,
            language_code: "es-ES".to_string(),
            output_dir: PathBuf::from("knowledge_output"),
            grace_wait: Duration::from_secs(15),
            grace_recheck: Duration::from_secs(10),
            delivery: DeliveryTiming {
                ceiling: Duration::from_secs(600),
                poll_interval: Duration::from_secs(2),
                farewell_hold: Duration::from_secs(8),
            },
            retrieval: RetrievalTiming {
                discovery_ceiling: Duration::from_secs(180),
                transcription_ceiling: Duration::from_secs(300),
                poll_interval: Duration::from_secs(10),
            },
        }
    }
}

/// Drives one interview at a time against the injected collaborators.
pub struct InterviewController {
    gateway: Arc<dyn TelephonyGateway>,
    store: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn TranscriptionService>,
    settings: InterviewSettings,
}

impl InterviewController {
    pub fn new(
        gateway: Arc<dyn TelephonyGateway>,
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn TranscriptionService>,
        settings: InterviewSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            transcriber,
            settings,
        }
    }

    /// Conduct a complete interview for the session owned by `handle`.
    ///
    /// Returns `Err` only on contract violations (an empty question list);
    /// every operational failure is folded into the returned result.
    #[instrument(skip(self, handle, questions), fields(user_id = %handle.session().user_id))]
    pub async fn conduct_interview(
        &self,
        handle: &mut SessionHandle,
        questions: Vec<String>,
    ) -> Result<InterviewResult> {
        let user_id = handle.session().user_id.clone();
        let phone_number = handle.session().phone_number.clone();

        if questions.is_empty() {
            anyhow::bail!("no questions to deliver for user {}", user_id);
        }

        let mut questions = questions;
        if questions.len() > self.settings.max_questions {
            debug!(
                dropped = questions.len() - self.settings.max_questions,
                "Capping question list"
            );
            questions.truncate(self.settings.max_questions);
        }

        for (i, question) in questions.iter().enumerate() {
            info!("  {}. {}", i + 1, truncate_for_log(question, 100));
        }

        {
            let session = handle.session_mut();
            session.question_queue = questions.clone();
            session.status = SessionStatus::Initiating;
        }

        // Place the call with question #1 in the opening prompt.
        let context = format!(
            "Entrevista de conocimiento para {} basada en análisis de código",
            user_id
        );
        let opening = format!("{} {}", OPENING_PROMPT, questions[0]);

        let contact_id = match self
            .gateway
            .place_call(&phone_number, &context, &opening)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Call placement failed");
                let mut result = InterviewResult::failure(
                    &user_id,
                    None,
                    format!("Error iniciando llamada: {}", e),
                );
                result.questions_asked = questions.len();
                self.record(handle, &result);
                return Ok(result);
            }
        };

        info!(%contact_id, "Call placed");
        {
            let session = handle.session_mut();
            session.contact_id = Some(contact_id.clone());
            session.delivered_count = 1;
        }

        // Grace wait: the platform needs a moment before the status query
        // reflects the new contact. One fixed delay, then at most one
        // re-check.
        tokio::time::sleep(self.settings.grace_wait).await;
        let mut status = self.gateway.query_status(&contact_id).await;
        if !status.active {
            info!(%contact_id, "Call not active yet, waiting once more");
            tokio::time::sleep(self.settings.grace_recheck).await;
            status = self.gateway.query_status(&contact_id).await;
        }

        let delivery = if status.active {
            info!(%contact_id, "Call confirmed active, starting question flow");
            handle.session_mut().status = SessionStatus::Active;

            let outcome = run_delivery_loop(
                self.gateway.as_ref(),
                &contact_id,
                &questions,
                &self.settings.delivery,
            )
            .await;

            handle.session_mut().delivered_count = 1 + outcome.questions_sent;
            Some(outcome)
        } else {
            warn!(%contact_id, "Could not confirm the call as active; skipping question flow");
            None
        };

        // Finalize regardless of what the delivery loop achieved.
        handle.session_mut().status = SessionStatus::Finalizing;
        let stopped = self.gateway.terminate(&contact_id).await;
        let finalize_ok = stopped || !self.gateway.query_status(&contact_id).await.active;
        if !finalize_ok {
            warn!(%contact_id, "Contact could not be stopped or confirmed ended");
        }

        // Transcript work is attempted even when finalization failed. A
        // degraded retrieval substitutes a sentinel for the transcript and
        // extraction runs over nothing, so documents are still produced.
        let (transcript, extraction_input) = match fetch_and_transcribe(
            self.store.as_ref(),
            self.transcriber.as_ref(),
            &contact_id,
            &self.settings.language_code,
            &self.settings.retrieval,
        )
        .await
        {
            Retrieval::Complete { transcript, .. } => (transcript.clone(), transcript),
            Retrieval::Degraded { sentinel } => {
                warn!(%contact_id, %sentinel, "Transcription degraded");
                (sentinel, String::new())
            }
            Retrieval::RecordingNotFound => {
                warn!(%contact_id, "No recording found; substituting sentinel transcript");
                (RECORDING_UNAVAILABLE.to_string(), String::new())
            }
        };

        info!("Generando documentos de conocimiento");
        let extraction = extractor::extract(&extraction_input);
        let record = knowledge::documents::build_record(
            handle.session(),
            &contact_id,
            &extraction,
            Utc::now(),
        );

        let (record_path, summary_path, document_error) =
            match knowledge::persist(&record, &self.settings.output_dir, Utc::now()) {
                Ok(docs) => (Some(docs.record_path), Some(docs.summary_path), None),
                Err(e) => {
                    warn!(error = %e, "Knowledge document persistence failed");
                    (None, None, Some(e.to_string()))
                }
            };

        let result = self.consolidate(
            &user_id,
            &contact_id,
            questions.len(),
            delivery,
            finalize_ok,
            transcript,
            record_path,
            summary_path,
            document_error,
        );

        self.record(handle, &result);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn consolidate(
        &self,
        user_id: &str,
        contact_id: &str,
        questions_asked: usize,
        delivery: Option<DeliveryOutcome>,
        finalize_ok: bool,
        transcript: String,
        record_path: Option<PathBuf>,
        summary_path: Option<PathBuf>,
        document_error: Option<String>,
    ) -> InterviewResult {
        let (questions_sent, delivery_complete) = delivery
            .as_ref()
            .map(|o| (o.questions_sent, o.success))
            .unwrap_or((0, false));

        let message = if !finalize_ok {
            format!(
                "Error finalizando llamada: no se pudo confirmar el término del contacto {}",
                contact_id
            )
        } else if delivery_complete {
            format!("Entrevista completada exitosamente para {}", user_id)
        } else {
            format!(
                "Entrevista finalizada con entrega parcial para {} ({} de {} preguntas del bucle)",
                user_id,
                questions_sent,
                questions_asked.saturating_sub(1)
            )
        };

        InterviewResult {
            success: finalize_ok,
            user_id: user_id.to_string(),
            contact_id: Some(contact_id.to_string()),
            questions_asked,
            questions_sent,
            delivery_complete,
            transcript: Some(transcript),
            record_path,
            summary_path,
            document_error,
            message,
        }
    }

    /// Persist the session record; a failure here is logged, never fatal.
    fn record(&self, handle: &mut SessionHandle, result: &InterviewResult) {
        if let Err(e) = handle.finish(result) {
            warn!(error = %e, "Could not write session record");
        }
    }
}

fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

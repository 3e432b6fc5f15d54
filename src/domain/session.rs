//! Interview session state and the consolidated interview result.
//!
//! Exactly one session is live at a time; the handle that owns an
//! `InterviewSession` is produced by the session registry and only the
//! controller and the delivery loop mutate it while a call is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One interview attempt, from placement to finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    /// Process-local session identifier
    pub id: Uuid,

    /// User the interview is about
    pub user_id: String,

    /// Destination phone number
    pub phone_number: String,

    /// Interview language (BCP 47 primary tag, e.g. "es")
    pub language: String,

    /// Current lifecycle status
    pub status: SessionStatus,

    /// Questions in delivery order; insertion order is delivery order
    pub question_queue: Vec<String>,

    /// Number of questions delivered so far (opening question included)
    pub delivered_count: usize,

    /// Platform-assigned contact id, once the call is placed
    pub contact_id: Option<String>,

    /// When the session was created
    pub started_at: DateTime<Utc>,
}

impl InterviewSession {
    /// Create a new idle session.
    pub fn new(user_id: &str, phone_number: &str, language: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            phone_number: phone_number.to_string(),
            language: language.to_string(),
            status: SessionStatus::Idle,
            question_queue: Vec::new(),
            delivered_count: 0,
            contact_id: None,
            started_at: Utc::now(),
        }
    }

    /// Whether the session has reached a terminal status.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Whether a call is currently being driven.
    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Initiating | SessionStatus::Active | SessionStatus::Finalizing
        )
    }
}

/// Lifecycle status of an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, no call placed yet
    Idle,

    /// Call placement in progress
    Initiating,

    /// Call confirmed active, questions being delivered
    Active,

    /// Call being stopped, transcript being retrieved
    Finalizing,

    /// Interview finished and documents generated
    Completed,

    /// Placement or finalization failed
    Failed,
}

/// Consolidated outcome of one interview, returned by the controller and
/// recorded under the sessions directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResult {
    /// Overall outcome; false only for placement or finalization failures
    pub success: bool,

    pub user_id: String,

    /// Contact id, when a call was placed
    pub contact_id: Option<String>,

    /// Questions queued after capping
    pub questions_asked: usize,

    /// Questions delivered by the in-call loop (the opening question is not counted)
    pub questions_sent: usize,

    /// Whether the delivery loop exhausted the queue before its ceiling
    pub delivery_complete: bool,

    /// Raw transcript text, or a sentinel when retrieval degraded
    pub transcript: Option<String>,

    /// Persisted structured record, when document generation succeeded
    pub record_path: Option<PathBuf>,

    /// Persisted human-readable summary, when document generation succeeded
    pub summary_path: Option<PathBuf>,

    /// Document persistence failure, surfaced without rolling anything back
    pub document_error: Option<String>,

    /// Human-readable outcome description
    pub message: String,
}

impl InterviewResult {
    /// A failure result with no call placed or no finalization confirmed.
    pub fn failure(user_id: &str, contact_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            user_id: user_id.to_string(),
            contact_id,
            questions_asked: 0,
            questions_sent: 0,
            delivery_complete: false,
            transcript: None,
            record_path: None,
            summary_path: None,
            document_error: None,
            message: message.into(),
        }
    }
}

//! Domain types for the callscribe orchestrator.
//!
//! This module contains the core data structures:
//! - `session`: interview session lifecycle and the consolidated result
//! - `transcript`: speaker turns and question/answer pairs
//! - `knowledge`: the persisted knowledge record

pub mod knowledge;
pub mod session;
pub mod transcript;

pub use knowledge::{
    KnowledgeExtraction, KnowledgeRecord, RecordMetadata, SessionSummary, UserProfile,
};
pub use session::{InterviewResult, InterviewSession, SessionStatus};
pub use transcript::{QaPair, Speaker, TranscriptTurn};

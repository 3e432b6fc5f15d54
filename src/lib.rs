//! callscribe - unattended phone-interview orchestrator
//!
//! Places an outbound call through a voice platform, delivers prepared
//! questions one at a time gated by a DTMF-driven acknowledgement
//! attribute, retrieves and transcribes the call recording, and converts
//! the transcript into persisted knowledge documents.
//!
//! # Architecture
//!
//! One session is live at a time. Control flows in a single direction:
//! controller → telephony gateway (place call) → delivery state machine
//! (poll acknowledgements, push questions) → gateway (stop call) →
//! retrieval pipeline (find recording, transcribe) → extractor → document
//! builder. The only cyclic interaction is the attribute-polling handshake
//! inside the delivery loop.
//!
//! # Modules
//!
//! - `adapters`: clients for the voice platform, recording store and
//!   transcription service, behind injectable traits
//! - `core`: orchestration (controller, delivery machine, retrieval,
//!   session registry)
//! - `domain`: data structures (session, transcript turns, knowledge record)
//! - `knowledge`: transcript extraction and document persistence
//! - `questions`: pluggable question sources
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Conduct an interview with a prepared question list
//! callscribe interview Rmx21 +525512345678 --questions preguntas.txt
//!
//! # Rebuild documents from a saved transcript
//! callscribe extract Rmx21 --transcript llamada.txt
//!
//! # List recorded sessions
//! callscribe sessions
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod knowledge;
pub mod questions;

// Re-export main types at crate root for convenience
pub use crate::core::{
    InterviewController, InterviewSettings, SessionHandle, SessionRegistry,
};
pub use domain::{InterviewResult, InterviewSession, QaPair, SessionStatus, Speaker, TranscriptTurn};
pub use knowledge::{Extraction, PersistedDocuments};
pub use questions::{AnalysisTextSource, QuestionSource, StaticQuestions};

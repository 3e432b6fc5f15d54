//! Core orchestration logic.
//!
//! This module contains:
//! - `controller`: top-level interview lifecycle
//! - `delivery`: the acknowledgement-gated question delivery state machine
//! - `retrieval`: recording discovery and transcription pipeline
//! - `registry`: single-owner session handles

pub mod controller;
pub mod delivery;
pub mod registry;
pub mod retrieval;

pub use controller::{InterviewController, InterviewSettings, OPENING_PROMPT, RECORDING_UNAVAILABLE};
pub use delivery::{
    run_delivery_loop, AckSignal, DeliveryMachine, DeliveryOutcome, DeliveryState, DeliveryTiming,
    Effect, FAREWELL_MESSAGE,
};
pub use registry::{RegistryError, SessionHandle, SessionRecord, SessionRegistry};
pub use retrieval::{
    fetch_and_transcribe, Retrieval, RetrievalTiming, TRANSCRIPTION_FAILED, TRANSCRIPTION_TIMEOUT,
};

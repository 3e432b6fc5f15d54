//! Transcript-to-knowledge extraction and document persistence.
//!
//! - `extractor`: deterministic transcript → QA pairs → derived tags
//! - `documents`: knowledge record + narrative summary rendering and persistence

pub mod documents;
pub mod extractor;

pub use documents::{document_basename, persist, render_summary, PersistError, PersistedDocuments};
pub use extractor::{extract, Extraction};

//! Knowledge document rendering and persistence.
//!
//! One `KnowledgeRecord` is built per interview; both persisted artifacts
//! (the structured JSON record and the Markdown summary) are rendered from
//! that single record. Filenames are a pure function of the user id and
//! the generation minute; two builds within the same minute for the same
//! user overwrite each other by design.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::knowledge::{
    KnowledgeExtraction, KnowledgeRecord, RecordMetadata, SessionSummary, UserProfile,
};
use crate::domain::InterviewSession;

use super::extractor::Extraction;

/// Document persistence failure. Completed call and transcription work is
/// never rolled back on account of one of these.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create output directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode knowledge record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Locations of the two persisted artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocuments {
    pub record_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Shared filename stem: `{YYYYMMDD-HHMM}-{userId}`.
pub fn document_basename(user_id: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", at.format("%Y%m%d-%H%M"), user_id)
}

/// Assemble the immutable knowledge record for one finished interview.
pub fn build_record(
    session: &InterviewSession,
    contact_id: &str,
    extraction: &Extraction,
    generated_at: DateTime<Utc>,
) -> KnowledgeRecord {
    KnowledgeRecord {
        user_profile: UserProfile {
            user_id: session.user_id.clone(),
            interview_date: session.started_at,
            phone_number: session.phone_number.clone(),
            language: session.language.clone(),
        },
        interview_session: SessionSummary {
            contact_id: contact_id.to_string(),
            total_interactions: extraction.turns.len(),
            questions_asked: extraction.qa_pairs.len(),
            responses_received: extraction.responses_received(),
        },
        knowledge_extraction: KnowledgeExtraction {
            qa_pairs: extraction.qa_pairs.clone(),
            key_insights: extraction.key_insights.clone(),
            technical_skills: extraction.technical_skills.clone(),
            experience_areas: extraction.experience_areas.clone(),
        },
        metadata: RecordMetadata {
            generated_at,
            version: crate::domain::knowledge::RECORD_VERSION.to_string(),
            source: crate::domain::knowledge::RECORD_SOURCE.to_string(),
        },
    }
}

/// Render the narrative summary from the record. Nothing here reads any
/// other data source, so the summary can never disagree with the record.
pub fn render_summary(record: &KnowledgeRecord) -> String {
    let profile = &record.user_profile;
    let session = &record.interview_session;
    let extraction = &record.knowledge_extraction;

    let date = profile.interview_date.format("%d-%m-%Y %H:%M UTC");

    let mut md = format!(
        "# Resumen de Conocimiento - {user}\n\n\
         ## Información General\n\
         - **Usuario:** {user}\n\
         - **Fecha de entrevista:** {date}\n\
         - **Teléfono:** {phone}\n\
         - **Idioma:** {language}\n\n\
         ## Detalles de la Sesión\n\
         - **ID de contacto:** {contact}\n\
         - **Total de interacciones:** {interactions}\n\
         - **Preguntas realizadas:** {questions}\n\
         - **Respuestas recibidas:** {responses}\n\n\
         ## Preguntas y Respuestas\n\n",
        user = profile.user_id,
        date = date,
        phone = profile.phone_number,
        language = profile.language,
        contact = session.contact_id,
        interactions = session.total_interactions,
        questions = session.questions_asked,
        responses = session.responses_received,
    );

    for pair in &extraction.qa_pairs {
        md.push_str(&format!(
            "### {}. {}\n**Respuesta:** {}\n\n",
            pair.sequence, pair.question, pair.answer
        ));
    }

    if !extraction.key_insights.is_empty() {
        md.push_str("## Insights Clave\n");
        for insight in &extraction.key_insights {
            md.push_str(&format!("- {}\n", insight));
        }
        md.push('\n');
    }

    if !extraction.technical_skills.is_empty() {
        md.push_str("## Habilidades Técnicas Identificadas\n");
        for skill in &extraction.technical_skills {
            md.push_str(&format!("- {}\n", skill));
        }
        md.push('\n');
    }

    if !extraction.experience_areas.is_empty() {
        md.push_str("## Áreas de Experiencia\n");
        for area in &extraction.experience_areas {
            md.push_str(&format!("- {}\n", area));
        }
        md.push('\n');
    }

    md.push_str(&format!(
        "---\n*Generado automáticamente por callscribe el {}*\n",
        date
    ));

    md
}

/// Write both artifacts under the output directory, creating it if absent.
pub fn persist(
    record: &KnowledgeRecord,
    output_dir: &Path,
    at: DateTime<Utc>,
) -> Result<PersistedDocuments, PersistError> {
    std::fs::create_dir_all(output_dir).map_err(|source| PersistError::CreateDir {
        dir: output_dir.to_path_buf(),
        source,
    })?;

    let base = document_basename(&record.user_profile.user_id, at);
    let record_path = output_dir.join(format!("{}.json", base));
    let summary_path = output_dir.join(format!("{}-summary.md", base));

    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&record_path, json).map_err(|source| PersistError::Write {
        path: record_path.clone(),
        source,
    })?;

    let summary = render_summary(record);
    std::fs::write(&summary_path, summary).map_err(|source| PersistError::Write {
        path: summary_path.clone(),
        source,
    })?;

    info!(
        record = %record_path.display(),
        summary = %summary_path.display(),
        "Knowledge documents written"
    );

    Ok(PersistedDocuments {
        record_path,
        summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::extractor::extract;
    use chrono::TimeZone;

    fn sample_record() -> KnowledgeRecord {
        let session = InterviewSession::new("Rmx21", "+525512345678", "es");
        let extraction = extract("Hola?\nBien\n¿Qué proyecto lideraste?\nEl proyecto X");
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        build_record(&session, "contact-1", &extraction, at)
    }

    #[test]
    fn test_basename_is_pure_function_of_user_and_minute() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 5).unwrap();
        let same_minute = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 59).unwrap();
        let next_minute = Utc.with_ymd_and_hms(2025, 3, 14, 9, 27, 0).unwrap();

        assert_eq!(document_basename("Rmx21", at), "20250314-0926-Rmx21");
        assert_eq!(
            document_basename("Rmx21", at),
            document_basename("Rmx21", same_minute)
        );
        assert_ne!(
            document_basename("Rmx21", at),
            document_basename("Rmx21", next_minute)
        );
    }

    #[test]
    fn test_summary_carries_every_pair_in_order() {
        let record = sample_record();
        let summary = render_summary(&record);

        for pair in &record.knowledge_extraction.qa_pairs {
            assert!(summary.contains(&pair.question));
            assert!(summary.contains(&pair.answer));
            assert!(summary.contains(&format!("### {}. ", pair.sequence)));
        }
    }

    #[test]
    fn test_persist_writes_both_artifacts() {
        let record = sample_record();
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 0).unwrap();

        let docs = persist(&record, dir.path(), at).unwrap();
        assert!(docs.record_path.ends_with("20250314-0926-Rmx21.json"));
        assert!(docs.summary_path.ends_with("20250314-0926-Rmx21-summary.md"));

        let reloaded: KnowledgeRecord =
            serde_json::from_str(&std::fs::read_to_string(&docs.record_path).unwrap()).unwrap();
        assert_eq!(
            reloaded.knowledge_extraction.qa_pairs,
            record.knowledge_extraction.qa_pairs
        );
    }

    #[test]
    fn test_same_minute_persist_overwrites_not_errors() {
        let record = sample_record();
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 0).unwrap();

        let first = persist(&record, dir.path(), at).unwrap();
        let second = persist(&record, dir.path(), at).unwrap();
        assert_eq!(first.record_path, second.record_path);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
    }
}

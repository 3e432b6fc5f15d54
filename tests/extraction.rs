//! Extraction and Document Scenario Tests
//!
//! End-to-end transcript → QA pairs → documents checks, including the
//! deterministic naming scheme and record/summary agreement.

use callscribe::domain::{InterviewSession, KnowledgeRecord, Speaker};
use callscribe::knowledge::{self, extractor};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

#[test]
fn test_greeting_scenario_yields_exactly_one_pair() {
    let extraction = extractor::extract("Hola?\nBien\n¿Qué proyecto lideraste?\nEl proyecto X");

    assert_eq!(extraction.qa_pairs.len(), 1);
    let pair = &extraction.qa_pairs[0];
    assert_eq!(pair.sequence, 1);
    assert_eq!(pair.question, "¿Qué proyecto lideraste?");
    assert_eq!(pair.answer, "El proyecto X");
}

#[test]
fn test_turn_counts_follow_line_parity() {
    for n in 1usize..=9 {
        let lines: Vec<String> = (0..n).map(|i| format!("utterance {}", i)).collect();
        let extraction = extractor::extract(&lines.join("\n"));

        let system = extraction
            .turns
            .iter()
            .filter(|t| t.speaker == Speaker::System)
            .count();
        let user = extraction
            .turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .count();

        assert_eq!(system, n.div_ceil(2), "system turns for {} lines", n);
        assert_eq!(user, n / 2, "user turns for {} lines", n);
    }
}

#[test]
fn test_more_questions_than_answers_never_panics() {
    let extraction = extractor::extract(
        "¿Primera pregunta?\nRespuesta uno\n¿Segunda pregunta?\nRespuesta dos\n¿Tercera pregunta?",
    );

    assert_eq!(extraction.qa_pairs.len(), 3);
    assert_eq!(extraction.qa_pairs[2].answer, "No respondió");
    assert_eq!(extraction.responses_received(), 2);
}

fn build_sample_record() -> KnowledgeRecord {
    let session = InterviewSession::new("Rmx21", "+525512345678", "es");
    let extraction = extractor::extract(
        "Hola?\nBien\n¿Qué proyecto lideraste?\nEl proyecto X con Docker\n¿Por qué esa arquitectura?\nPor el backend",
    );
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
    knowledge::documents::build_record(&session, "contact-5", &extraction, at)
}

#[test]
fn test_record_and_summary_agree_on_sequence_ordered_pairs() {
    let record = build_sample_record();
    let summary = knowledge::render_summary(&record);

    // Every pair appears, in sequence order, and none are invented.
    let mut last_pos = 0;
    for pair in &record.knowledge_extraction.qa_pairs {
        let heading = format!("### {}. {}", pair.sequence, pair.question);
        let pos = summary.find(&heading).expect("pair missing from summary");
        assert!(pos > last_pos || last_pos == 0);
        last_pos = pos;
    }
    assert_eq!(
        summary.matches("### ").count(),
        record.knowledge_extraction.qa_pairs.len()
    );
}

#[test]
fn test_filenames_are_pure_function_of_user_and_minute() {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 11).unwrap();
    let later_same_minute = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 59).unwrap();

    assert_eq!(
        knowledge::document_basename("Rmx21", at),
        knowledge::document_basename("Rmx21", later_same_minute)
    );
    assert_eq!(knowledge::document_basename("Rmx21", at), "20250601-1230-Rmx21");
}

#[test]
fn test_same_minute_rebuild_overwrites_instead_of_erroring() {
    let record = build_sample_record();
    let dir = TempDir::new().unwrap();
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();

    let first = knowledge::persist(&record, dir.path(), at).unwrap();
    let second = knowledge::persist(&record, dir.path(), at).unwrap();

    assert_eq!(first.record_path, second.record_path);
    assert_eq!(first.summary_path, second.summary_path);

    // Still exactly two files: the rebuild replaced them.
    let count = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(count, 2);
}

#[test]
fn test_persisted_record_round_trips() {
    let record = build_sample_record();
    let dir = TempDir::new().unwrap();
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();

    let docs = knowledge::persist(&record, dir.path(), at).unwrap();
    let reloaded: KnowledgeRecord =
        serde_json::from_str(&std::fs::read_to_string(&docs.record_path).unwrap()).unwrap();

    assert_eq!(
        reloaded.knowledge_extraction.qa_pairs,
        record.knowledge_extraction.qa_pairs
    );
    assert_eq!(reloaded.interview_session.contact_id, "contact-5");
    // Tags derive from the answers alone.
    assert!(reloaded
        .knowledge_extraction
        .technical_skills
        .contains(&"Docker".to_string()));
    assert!(reloaded
        .knowledge_extraction
        .experience_areas
        .contains(&"Desarrollo Backend".to_string()));
}

#[test]
fn test_empty_transcript_still_produces_documents() {
    let session = InterviewSession::new("Rmx21", "+525512345678", "es");
    let extraction = extractor::extract("");
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 31, 0).unwrap();
    let record = knowledge::documents::build_record(&session, "contact-5", &extraction, at);

    assert!(record.knowledge_extraction.qa_pairs.is_empty());
    assert_eq!(record.interview_session.questions_asked, 0);

    let dir = TempDir::new().unwrap();
    let docs = knowledge::persist(&record, dir.path(), at).unwrap();
    assert!(docs.record_path.exists());
    assert!(docs.summary_path.exists());
}

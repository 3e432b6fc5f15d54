//! The knowledge record persisted after an interview.
//!
//! A `KnowledgeRecord` aggregates session metadata, the ordered QA pairs and
//! the derived tag lists. It is immutable once built; both persisted
//! artifacts (structured record and narrative summary) are rendered from the
//! same record so they can never diverge in content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::transcript::QaPair;

/// Record format version written into `metadata.version`.
pub const RECORD_VERSION: &str = "1.0";

/// Value written into `metadata.source`.
pub const RECORD_SOURCE: &str = "callscribe_interview";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub user_profile: UserProfile,
    pub interview_session: SessionSummary,
    pub knowledge_extraction: KnowledgeExtraction,
    pub metadata: RecordMetadata,
}

/// Who was interviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub interview_date: DateTime<Utc>,
    pub phone_number: String,
    pub language: String,
}

/// Counters describing the call itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub contact_id: String,
    /// Every turn in the transcript, boilerplate included
    pub total_interactions: usize,
    /// Question slots that survived boilerplate filtering
    pub questions_asked: usize,
    /// Slots with a real answer (not the no-answer sentinel)
    pub responses_received: usize,
}

/// What was extracted from the answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeExtraction {
    pub qa_pairs: Vec<QaPair>,
    pub key_insights: Vec<String>,
    pub technical_skills: Vec<String>,
    pub experience_areas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub source: String,
}

impl RecordMetadata {
    pub fn now() -> Self {
        Self {
            generated_at: Utc::now(),
            version: RECORD_VERSION.to_string(),
            source: RECORD_SOURCE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trips_through_json() {
        let record = KnowledgeRecord {
            user_profile: UserProfile {
                user_id: "Rmx21".to_string(),
                interview_date: Utc::now(),
                phone_number: "+525512345678".to_string(),
                language: "es".to_string(),
            },
            interview_session: SessionSummary {
                contact_id: "contact-1".to_string(),
                total_interactions: 4,
                questions_asked: 1,
                responses_received: 1,
            },
            knowledge_extraction: KnowledgeExtraction {
                qa_pairs: vec![QaPair {
                    sequence: 1,
                    question: "¿Qué proyecto lideraste?".to_string(),
                    answer: "El proyecto X".to_string(),
                }],
                key_insights: vec![],
                technical_skills: vec![],
                experience_areas: vec![],
            },
            metadata: RecordMetadata::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: KnowledgeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.knowledge_extraction.qa_pairs, record.knowledge_extraction.qa_pairs);
        assert_eq!(back.interview_session.questions_asked, 1);
    }
}

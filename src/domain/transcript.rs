//! Speaker turns derived from a raw transcript, and question/answer pairs.
//!
//! The transcription service returns one utterance per line with no speaker
//! tags. Speakers are assigned by position parity: the flow speaks first, so
//! even lines belong to the system and odd lines to the interviewee. This is
//! a structural assumption; consecutive utterances by the same speaker will
//! be mis-attributed.

use serde::{Deserialize, Serialize};

/// Answer recorded when no interviewee turn exists for a question slot.
pub const NO_ANSWER: &str = "No respondió";

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The interview flow (greeting, questions, farewell)
    System,

    /// The interviewee
    User,
}

/// A single utterance attributed to one speaker. Ordering is significant
/// and fixed once derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptTurn {
    /// Split a raw newline-delimited transcript into ordered turns.
    ///
    /// Lines are trimmed and blank lines dropped before parity is assigned,
    /// so N non-empty lines always yield ceil(N/2) system turns and
    /// floor(N/2) user turns.
    pub fn split(transcript: &str) -> Vec<TranscriptTurn> {
        transcript
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| TranscriptTurn {
                speaker: if i % 2 == 0 { Speaker::System } else { Speaker::User },
                text: line.to_string(),
            })
            .collect()
    }
}

/// One delivered question paired with the interviewee's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// 1-based position in the interview
    pub sequence: usize,

    pub question: String,

    /// The answer, or [`NO_ANSWER`] when the slot has no interviewee turn
    pub answer: String,
}

impl QaPair {
    /// Whether the interviewee actually answered this slot.
    pub fn answered(&self) -> bool {
        self.answer != NO_ANSWER
    }
}

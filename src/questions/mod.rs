//! Question sources for the interview.
//!
//! The orchestrator only needs an ordered list of question strings; where
//! they come from is a pluggable capability. `AnalysisTextSource` recovers
//! questions from free-form analysis text with pattern heuristics, which is
//! best-effort by nature; the orchestrator never depends on its internals.

use regex::Regex;

/// Supplies the ordered question list for an interview.
pub trait QuestionSource {
    /// Up to `max` questions, in delivery order.
    fn questions(&self, max: usize) -> Vec<String>;
}

/// A literal, pre-authored question list.
pub struct StaticQuestions(pub Vec<String>);

impl QuestionSource for StaticQuestions {
    fn questions(&self, max: usize) -> Vec<String> {
        self.0.iter().take(max).cloned().collect()
    }
}

/// Extracts questions from free-form analysis text.
pub struct AnalysisTextSource {
    text: String,
}

impl AnalysisTextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl QuestionSource for AnalysisTextSource {
    fn questions(&self, max: usize) -> Vec<String> {
        extract_questions(&self.text, max)
    }
}

/// Interrogative patterns scanned over the analysis text, in priority
/// order. The third pattern captures the question after a label.
const QUESTION_PATTERNS: [&str; 4] = [
    r"[¿?][^¿?]*[?¿]",
    r"(?m)^[¿?].+[?¿]$",
    r"(?i)(?:pregunta|question)[:.]?\s*(.+[?¿])",
    r"(?i)(?:cuéntame|explica|describe|por qué|cómo|qué).+[?¿]",
];

fn extract_questions(analysis: &str, max: usize) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for pattern in QUESTION_PATTERNS {
        let Ok(re) = Regex::new(pattern) else { continue };

        for captures in re.captures_iter(analysis) {
            let matched = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            if matched.chars().count() <= 10 {
                continue;
            }
            // The patterns overlap, so later ones often re-match a fragment
            // of an already-collected question. Containment counts as a
            // duplicate.
            if found
                .iter()
                .any(|f| f.contains(matched.as_str()) || matched.contains(f.as_str()))
            {
                continue;
            }
            found.push(matched);
        }
    }

    // Fallback: whole lines that read as questions.
    if found.is_empty() {
        for line in analysis.lines() {
            let line = line.trim();
            if (line.ends_with('?') || line.ends_with('¿'))
                && line.chars().count() > 15
                && !found.contains(&line.to_string())
            {
                found.push(line.to_string());
            }
        }
    }

    let label = Regex::new(r"(?i)^pregunta\s*\d*[:.]?\s*");
    let numbering = Regex::new(r"^[\d.\-*\s]+");

    let mut cleaned = Vec::new();
    for question in found.into_iter().take(max) {
        let mut q = question;
        if let Ok(ref re) = label {
            q = re.replace(&q, "").to_string();
        }
        if let Ok(ref re) = numbering {
            q = re.replace(&q, "").to_string();
        }
        let q = q.trim().to_string();

        if q.chars().count() > 10 && !cleaned.contains(&q) {
            cleaned.push(q);
        }
    }

    cleaned.truncate(max);
    cleaned
}

//! Deterministic transcript-to-knowledge extraction.
//!
//! Stateless transform from a raw transcript to ordered QA pairs and
//! keyword-derived tag lists. System turns carrying boilerplate (DTMF menu
//! instructions, the opening greeting) are filtered out together with their
//! adjacent replies before the remaining turns are treated as delivered
//! questions.

use crate::domain::transcript::{QaPair, Speaker, TranscriptTurn, NO_ANSWER};

/// Menu instructions the flow appends to spoken prompts; stripped from
/// system turns before they are considered questions.
const DTMF_INSTRUCTIONS: [&str; 2] = [
    "responde IDD click en uno para continuar.",
    "responde IDDA click en uno para continuar.",
];

/// Lowercased prefixes that mark the opening greeting.
const GREETING_PREFIXES: [&str; 2] = ["hola", "es un buen momento"];

const TOOL_KEYWORDS: [&str; 5] = ["docker", "kubernetes", "terraform", "jenkins", "git"];

const TECHNOLOGY_KEYWORDS: [&str; 25] = [
    "python",
    "javascript",
    "java",
    "c++",
    "c#",
    "go",
    "rust",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "react",
    "vue",
    "angular",
    "django",
    "flask",
    "fastapi",
    "mysql",
    "postgresql",
    "mongodb",
    "redis",
    "jenkins",
    "git",
];

/// Everything derived from one transcript.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// All turns, boilerplate included
    pub turns: Vec<TranscriptTurn>,

    /// Question slots that survived boilerplate filtering, in order
    pub qa_pairs: Vec<QaPair>,

    pub key_insights: Vec<String>,
    pub technical_skills: Vec<String>,
    pub experience_areas: Vec<String>,
}

impl Extraction {
    /// Slots the interviewee actually answered.
    pub fn responses_received(&self) -> usize {
        self.qa_pairs.iter().filter(|p| p.answered()).count()
    }
}

/// Run the full extraction over a raw transcript.
pub fn extract(transcript: &str) -> Extraction {
    let turns = TranscriptTurn::split(transcript);
    let qa_pairs = pair_questions(&turns);
    let key_insights = key_insights(&qa_pairs);
    let technical_skills = technical_skills(&qa_pairs);
    let experience_areas = experience_areas(&qa_pairs);

    Extraction {
        turns,
        qa_pairs,
        key_insights,
        technical_skills,
        experience_areas,
    }
}

/// Strip DTMF menu instructions from a system turn.
fn clean_system_text(text: &str) -> String {
    let mut cleaned = text.to_string();
    for marker in DTMF_INSTRUCTIONS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.trim().to_string()
}

/// A system turn that is not a question: emptied by instruction stripping,
/// or the opening greeting.
fn is_boilerplate(cleaned: &str) -> bool {
    if cleaned.is_empty() {
        return true;
    }
    let lower = cleaned.to_lowercase();
    GREETING_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Pair each system turn with the user turn that follows it, drop
/// boilerplate slots (greeting replies go with the greeting), and number
/// the survivors. A slot with no following user turn gets the no-answer
/// sentinel.
fn pair_questions(turns: &[TranscriptTurn]) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < turns.len() {
        if turns[i].speaker != Speaker::System {
            i += 1;
            continue;
        }

        let question = clean_system_text(&turns[i].text);
        let answer = turns
            .get(i + 1)
            .filter(|t| t.speaker == Speaker::User)
            .map(|t| t.text.clone());

        if !is_boilerplate(&question) {
            pairs.push(QaPair {
                sequence: pairs.len() + 1,
                question,
                answer: answer.unwrap_or_else(|| NO_ANSWER.to_string()),
            });
        }

        i += 2;
    }

    pairs
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Keyword scan for noteworthy statements in the answers.
fn key_insights(pairs: &[QaPair]) -> Vec<String> {
    let mut insights = Vec::new();

    for pair in pairs {
        let answer = pair.answer.to_lowercase();

        if (answer.contains("python") || answer.contains("aws")) && answer.contains("experiencia") {
            push_unique(&mut insights, "Tiene experiencia con Python y/o AWS".to_string());
        }

        if answer.contains("proyecto")
            || answer.contains("desarrollé")
            || answer.contains("implementé")
        {
            push_unique(
                &mut insights,
                "Ha participado en desarrollo de proyectos".to_string(),
            );
        }

        let tools: Vec<&str> = TOOL_KEYWORDS
            .iter()
            .filter(|tool| answer.contains(*tool))
            .copied()
            .collect();
        if !tools.is_empty() {
            push_unique(
                &mut insights,
                format!("Experiencia con herramientas: {}", tools.join(", ")),
            );
        }
    }

    insights.sort();
    insights
}

/// Technologies mentioned in the answers, display-cased.
fn technical_skills(pairs: &[QaPair]) -> Vec<String> {
    let mut skills = Vec::new();

    for pair in pairs {
        let answer = pair.answer.to_lowercase();
        for tech in TECHNOLOGY_KEYWORDS {
            if answer.contains(tech) {
                push_unique(&mut skills, display_case(tech));
            }
        }
    }

    skills.sort();
    skills
}

fn display_case(tech: &str) -> String {
    match tech {
        "aws" | "gcp" => tech.to_uppercase(),
        _ => {
            let mut chars = tech.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

/// Broad experience areas inferred from the answers.
fn experience_areas(pairs: &[QaPair]) -> Vec<String> {
    let mut areas = Vec::new();

    for pair in pairs {
        let answer = pair.answer.to_lowercase();

        if answer.contains("backend") || answer.contains("api") {
            push_unique(&mut areas, "Desarrollo Backend".to_string());
        }
        if answer.contains("frontend") || answer.contains("ui") || answer.contains("interfaz") {
            push_unique(&mut areas, "Desarrollo Frontend".to_string());
        }
        if answer.contains("devops") || answer.contains("infraestructura") {
            push_unique(&mut areas, "DevOps e Infraestructura".to_string());
        }
        if answer.contains("base de datos") || answer.contains("database") {
            push_unique(&mut areas, "Gestión de Bases de Datos".to_string());
        }
        if answer.contains("machine learning")
            || answer.contains("inteligencia artificial")
            || answer.split_whitespace().any(|w| w == "ia")
        {
            push_unique(&mut areas, "Inteligencia Artificial/ML".to_string());
        }
    }

    areas.sort();
    areas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_and_its_reply_are_filtered() {
        let extraction = extract("Hola?\nBien\n¿Qué proyecto lideraste?\nEl proyecto X");

        assert_eq!(extraction.turns.len(), 4);
        assert_eq!(extraction.qa_pairs.len(), 1);

        let pair = &extraction.qa_pairs[0];
        assert_eq!(pair.sequence, 1);
        assert_eq!(pair.question, "¿Qué proyecto lideraste?");
        assert_eq!(pair.answer, "El proyecto X");
    }

    #[test]
    fn test_dtmf_instructions_are_stripped() {
        let transcript = "¿Qué stack usaste? responde IDD click en uno para continuar.\nRust y AWS";
        let extraction = extract(transcript);

        assert_eq!(extraction.qa_pairs.len(), 1);
        assert_eq!(extraction.qa_pairs[0].question, "¿Qué stack usaste?");
    }

    #[test]
    fn test_instruction_only_turn_is_dropped_with_its_reply() {
        let transcript = "responde IDDA click en uno para continuar.\nuno\n¿Por qué esa base de datos?\nPor el esquema";
        let extraction = extract(transcript);

        assert_eq!(extraction.qa_pairs.len(), 1);
        assert_eq!(extraction.qa_pairs[0].question, "¿Por qué esa base de datos?");
        assert_eq!(extraction.qa_pairs[0].answer, "Por el esquema");
    }

    #[test]
    fn test_missing_answer_resolves_to_sentinel() {
        let extraction = extract("¿Qué proyecto lideraste?");

        assert_eq!(extraction.qa_pairs.len(), 1);
        assert_eq!(extraction.qa_pairs[0].answer, NO_ANSWER);
        assert_eq!(extraction.responses_received(), 0);
    }

    #[test]
    fn test_empty_transcript_degrades_to_nothing() {
        let extraction = extract("");
        assert!(extraction.turns.is_empty());
        assert!(extraction.qa_pairs.is_empty());
    }

    #[test]
    fn test_insights_from_keywords() {
        let extraction = extract(
            "¿Qué hiciste?\nTengo experiencia con Python y AWS, desarrollé el backend con Docker y Git",
        );

        assert!(extraction
            .key_insights
            .contains(&"Tiene experiencia con Python y/o AWS".to_string()));
        assert!(extraction
            .key_insights
            .contains(&"Experiencia con herramientas: docker, git".to_string()));
        assert!(extraction.technical_skills.contains(&"Python".to_string()));
        assert!(extraction.technical_skills.contains(&"AWS".to_string()));
        assert!(extraction
            .experience_areas
            .contains(&"Desarrollo Backend".to_string()));
    }

    #[test]
    fn test_tags_are_deduplicated() {
        let extraction = extract(
            "¿Primera?\nUsé Docker en el proyecto\n¿Segunda?\nDocker otra vez en otro proyecto",
        );

        let docker_count = extraction
            .technical_skills
            .iter()
            .filter(|s| *s == "Docker")
            .count();
        assert_eq!(docker_count, 1);

        let project_count = extraction
            .key_insights
            .iter()
            .filter(|i| *i == "Ha participado en desarrollo de proyectos")
            .count();
        assert_eq!(project_count, 1);
    }
}

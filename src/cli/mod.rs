//! Command-line interface for callscribe.
//!
//! Provides commands for conducting a phone interview, previewing question
//! extraction, generating documents from an existing transcript, listing
//! recorded sessions, and inspecting the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::adapters::{RecordingStoreClient, TranscribeClient, VoicePlatformClient};
use crate::config;
use crate::core::{InterviewController, SessionRegistry};
use crate::domain::InterviewSession;
use crate::knowledge::{self, extractor};
use crate::questions::{AnalysisTextSource, QuestionSource};

/// callscribe - unattended phone-interview orchestrator
#[derive(Parser, Debug)]
#[command(name = "callscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Conduct a phone interview and generate knowledge documents
    Interview {
        /// User the interview is about (e.g. "Rmx21")
        user_id: String,

        /// Destination phone number (e.g. "+525512345678")
        phone_number: String,

        /// File with one question per line
        #[arg(short, long)]
        questions: Option<PathBuf>,

        /// Analysis text file to extract questions from
        #[arg(short, long)]
        analysis: Option<PathBuf>,
    },

    /// Preview the questions extracted from an analysis file
    Questions {
        /// Analysis text file
        analysis: PathBuf,

        /// Maximum number of questions to extract
        #[arg(short, long, default_value = "4")]
        max: usize,
    },

    /// Generate knowledge documents from an existing transcript
    Extract {
        /// User the transcript belongs to
        user_id: String,

        /// Transcript file (one utterance per line)
        #[arg(short, long)]
        transcript: PathBuf,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List recorded interview sessions
    Sessions {
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Interview {
                user_id,
                phone_number,
                questions,
                analysis,
            } => run_interview(&user_id, &phone_number, questions, analysis).await,
            Commands::Questions { analysis, max } => preview_questions(&analysis, max),
            Commands::Extract {
                user_id,
                transcript,
                output,
            } => extract_transcript(&user_id, &transcript, output),
            Commands::Sessions { limit } => list_sessions(limit),
            Commands::Config => show_config(),
        }
    }
}

/// Load the question list from either input flag.
fn load_questions(
    questions_file: Option<PathBuf>,
    analysis_file: Option<PathBuf>,
    max: usize,
) -> Result<Vec<String>> {
    if let Some(path) = questions_file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read questions file: {}", path.display()))?;
        let questions: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();
        return Ok(questions);
    }

    if let Some(path) = analysis_file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read analysis file: {}", path.display()))?;
        return Ok(AnalysisTextSource::new(content).questions(max));
    }

    anyhow::bail!("No questions provided. Use --questions <file> or --analysis <file>");
}

/// Conduct a full phone interview
async fn run_interview(
    user_id: &str,
    phone_number: &str,
    questions_file: Option<PathBuf>,
    analysis_file: Option<PathBuf>,
) -> Result<()> {
    let cfg = config::config()?;

    let questions = load_questions(questions_file, analysis_file, cfg.limits.max_questions)?;
    if questions.is_empty() {
        anyhow::bail!("No se pudieron obtener preguntas para la entrevista");
    }

    let voice = VoicePlatformClient::new(cfg.voice()?);
    let store = RecordingStoreClient::new(cfg.storage()?);
    let transcribe_cfg = cfg.transcribe()?;
    let language_code = transcribe_cfg.language_code.clone();
    let transcriber = TranscribeClient::new(transcribe_cfg);

    let registry = SessionRegistry::new(&cfg.home);
    let mut handle = registry.acquire(user_id, phone_number, &cfg.limits.language)?;

    let controller = InterviewController::new(
        Arc::new(voice),
        Arc::new(store),
        Arc::new(transcriber),
        cfg.limits.settings(language_code, cfg.output_dir.clone()),
    );

    let result = controller.conduct_interview(&mut handle, questions).await?;

    println!("Resultado: {}", result.message);
    println!("  Preguntas en cola:   {}", result.questions_asked);
    println!("  Enviadas por bucle:  {}", result.questions_sent);
    if let Some(path) = &result.record_path {
        println!("  Registro:            {}", path.display());
    }
    if let Some(path) = &result.summary_path {
        println!("  Resumen:             {}", path.display());
    }
    if let Some(error) = &result.document_error {
        eprintln!("  Error de documentos: {}", error);
    }

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}

/// Preview question extraction from an analysis file
fn preview_questions(analysis: &PathBuf, max: usize) -> Result<()> {
    let content = std::fs::read_to_string(analysis)
        .with_context(|| format!("Failed to read analysis file: {}", analysis.display()))?;

    let questions = AnalysisTextSource::new(content).questions(max);

    if questions.is_empty() {
        println!("No questions found in {}", analysis.display());
        return Ok(());
    }

    for (i, question) in questions.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }

    Ok(())
}

/// Generate documents from an existing transcript file
fn extract_transcript(user_id: &str, transcript: &PathBuf, output: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;
    let output_dir = output.unwrap_or_else(|| cfg.output_dir.clone());

    let text = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read transcript: {}", transcript.display()))?;

    let session = InterviewSession::new(user_id, "", &cfg.limits.language);
    let extraction = extractor::extract(&text);
    let record = knowledge::documents::build_record(&session, "offline", &extraction, Utc::now());
    let docs = knowledge::persist(&record, &output_dir, Utc::now())?;

    println!("Pares pregunta/respuesta: {}", record.knowledge_extraction.qa_pairs.len());
    println!("Registro: {}", docs.record_path.display());
    println!("Resumen:  {}", docs.summary_path.display());

    Ok(())
}

/// List recorded sessions
fn list_sessions(limit: usize) -> Result<()> {
    let cfg = config::config()?;
    let registry = SessionRegistry::new(&cfg.home);

    let records = registry.list_records()?;
    if records.is_empty() {
        println!("No recorded sessions. Use 'callscribe interview' to conduct one.");
        return Ok(());
    }

    println!(
        "{:<22} {:<12} {:<8} {:<8} {:<40}",
        "STARTED", "USER", "STATUS", "SENT", "MESSAGE"
    );
    println!("{}", "-".repeat(92));

    for record in records.iter().take(limit) {
        let status = if record.result.success { "ok" } else { "failed" };
        let message = if record.result.message.chars().count() > 37 {
            let head: String = record.result.message.chars().take(37).collect();
            format!("{}...", head)
        } else {
            record.result.message.clone()
        };
        println!(
            "{:<22} {:<12} {:<8} {:<8} {:<40}",
            record.session.started_at.format("%Y-%m-%d %H:%M:%S"),
            record.session.user_id,
            status,
            record.result.questions_sent,
            message
        );
    }

    println!("\nTotal: {} sessions", records.len());

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Paths:");
    println!("  Home (state):     {}", cfg.home.display());
    println!("  Sessions:         {}", cfg.home.join("sessions").display());
    println!("  Knowledge output: {}", cfg.output_dir.display());
    println!();
    println!("Services:");
    println!("  Voice platform:       {}", cfg.voice.as_ref().map(|v| v.api_url.as_str()).unwrap_or("(not configured)"));
    println!("  Recording store:      {}", cfg.storage.as_ref().map(|s| s.api_url.as_str()).unwrap_or("(not configured)"));
    println!("  Transcription:        {}", cfg.transcribe.as_ref().map(|t| t.api_url.as_str()).unwrap_or("(not configured)"));
    println!();
    println!("Interview limits:");
    println!("  Max questions:          {}", cfg.limits.max_questions);
    println!("  Language:               {}", cfg.limits.language);
    println!("  Delivery ceiling:       {}s", cfg.limits.delivery_ceiling_secs);
    println!("  Delivery poll:          {}s", cfg.limits.delivery_poll_secs);
    println!("  Grace wait / re-check:  {}s / {}s", cfg.limits.grace_wait_secs, cfg.limits.grace_recheck_secs);
    println!("  Farewell hold:          {}s", cfg.limits.farewell_hold_secs);
    println!("  Discovery ceiling:      {}s", cfg.limits.discovery_ceiling_secs);
    println!("  Transcription ceiling:  {}s", cfg.limits.transcription_ceiling_secs);
    println!("  Retrieval poll:         {}s", cfg.limits.retrieval_poll_secs);

    Ok(())
}

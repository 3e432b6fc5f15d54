//! Configuration for callscribe.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CALLSCRIBE_HOME, CALLSCRIBE_OUTPUT, plus the
//!    per-service credentials below)
//! 2. Config file (.callscribe/config.yaml)
//! 3. Defaults (~/.callscribe, ./knowledge_output)
//!
//! Config file discovery:
//! - Searches current directory and parents for .callscribe/config.yaml
//! - Service sections mirror the client config structs verbatim

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::storage::RecordingStoreConfig;
use crate::adapters::transcribe::TranscribeConfig;
use crate::adapters::voice::VoicePlatformConfig;
use crate::core::controller::InterviewSettings;
use crate::core::delivery::DeliveryTiming;
use crate::core::retrieval::RetrievalTiming;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub voice: Option<VoicePlatformConfig>,
    #[serde(default)]
    pub storage: Option<RecordingStoreConfig>,
    #[serde(default)]
    pub transcribe: Option<TranscribeConfig>,
    #[serde(default)]
    pub interview: InterviewLimits,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to config file)
    pub home: Option<String>,
    /// Knowledge document output directory (relative to config file)
    pub output: Option<String>,
}

/// Interview cadence and budgets, all overridable from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct InterviewLimits {
    /// Questions beyond this cap are silently dropped
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,

    /// Interview language (primary tag, used in session metadata)
    #[serde(default = "default_language")]
    pub language: String,

    /// Wall-clock budget for the question delivery loop
    #[serde(default = "default_delivery_ceiling")]
    pub delivery_ceiling_secs: u64,

    /// Sleep between acknowledgement polls
    #[serde(default = "default_delivery_poll")]
    pub delivery_poll_secs: u64,

    /// Fixed wait after call placement before the first status check
    #[serde(default = "default_grace_wait")]
    pub grace_wait_secs: u64,

    /// Extra wait before the single status re-check
    #[serde(default = "default_grace_recheck")]
    pub grace_recheck_secs: u64,

    /// Pause between farewell delivery and stopping the contact
    #[serde(default = "default_farewell_hold")]
    pub farewell_hold_secs: u64,

    /// Budget for the recording to appear in the store
    #[serde(default = "default_discovery_ceiling")]
    pub discovery_ceiling_secs: u64,

    /// Budget for the transcription job to finish
    #[serde(default = "default_transcription_ceiling")]
    pub transcription_ceiling_secs: u64,

    /// Sleep between retrieval polls (both phases)
    #[serde(default = "default_retrieval_poll")]
    pub retrieval_poll_secs: u64,
}

fn default_max_questions() -> usize {
    4
}
fn default_language() -> String {
    "es".to_string()
}
fn default_delivery_ceiling() -> u64 {
    600
} // 10 min
fn default_delivery_poll() -> u64 {
    2
}
fn default_grace_wait() -> u64 {
    15
}
fn default_grace_recheck() -> u64 {
    10
}
fn default_farewell_hold() -> u64 {
    8
}
fn default_discovery_ceiling() -> u64 {
    180
} // 3 min
fn default_transcription_ceiling() -> u64 {
    300
} // 5 min
fn default_retrieval_poll() -> u64 {
    10
}

impl Default for InterviewLimits {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            language: default_language(),
            delivery_ceiling_secs: default_delivery_ceiling(),
            delivery_poll_secs: default_delivery_poll(),
            grace_wait_secs: default_grace_wait(),
            grace_recheck_secs: default_grace_recheck(),
            farewell_hold_secs: default_farewell_hold(),
            discovery_ceiling_secs: default_discovery_ceiling(),
            transcription_ceiling_secs: default_transcription_ceiling(),
            retrieval_poll_secs: default_retrieval_poll(),
        }
    }
}

impl InterviewLimits {
    /// Assemble runtime controller settings from these limits.
    pub fn settings(&self, language_code: String, output_dir: PathBuf) -> InterviewSettings {
        InterviewSettings {
            max_questions: self.max_questions,
            language_code,
            output_dir,
            grace_wait: Duration::from_secs(self.grace_wait_secs),
            grace_recheck: Duration::from_secs(self.grace_recheck_secs),
            delivery: DeliveryTiming {
                ceiling: Duration::from_secs(self.delivery_ceiling_secs),
                poll_interval: Duration::from_secs(self.delivery_poll_secs),
                farewell_hold: Duration::from_secs(self.farewell_hold_secs),
            },
            retrieval: RetrievalTiming {
                discovery_ceiling: Duration::from_secs(self.discovery_ceiling_secs),
                transcription_ceiling: Duration::from_secs(self.transcription_ceiling_secs),
                poll_interval: Duration::from_secs(self.retrieval_poll_secs),
            },
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the callscribe home (lock, session records)
    pub home: PathBuf,
    /// Where knowledge documents are written
    pub output_dir: PathBuf,
    /// Voice platform credentials, when configured
    pub voice: Option<VoicePlatformConfig>,
    /// Recording store credentials, when configured
    pub storage: Option<RecordingStoreConfig>,
    /// Transcription service credentials, when configured
    pub transcribe: Option<TranscribeConfig>,
    /// Interview cadence and budgets
    pub limits: InterviewLimits,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn voice(&self) -> Result<VoicePlatformConfig> {
        self.voice.clone().context(
            "voice platform not configured (set VOICE_API_URL, VOICE_API_TOKEN, \
             VOICE_INSTANCE_ID, VOICE_FLOW_ID, SOURCE_PHONE_NUMBER or add a `voice` \
             section to .callscribe/config.yaml)",
        )
    }

    pub fn storage(&self) -> Result<RecordingStoreConfig> {
        self.storage.clone().context(
            "recording store not configured (set RECORDING_STORE_URL, \
             RECORDING_STORE_TOKEN or add a `storage` section to .callscribe/config.yaml)",
        )
    }

    pub fn transcribe(&self) -> Result<TranscribeConfig> {
        self.transcribe.clone().context(
            "transcription service not configured (set TRANSCRIBE_API_URL, \
             TRANSCRIBE_API_TOKEN or add a `transcribe` section to .callscribe/config.yaml)",
        )
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".callscribe").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Voice platform credentials from the environment, when complete.
fn voice_from_env() -> Option<VoicePlatformConfig> {
    Some(VoicePlatformConfig {
        api_url: env_var("VOICE_API_URL")?,
        api_token: env_var("VOICE_API_TOKEN")?,
        instance_id: env_var("VOICE_INSTANCE_ID")?,
        flow_id: env_var("VOICE_FLOW_ID")?,
        source_number: env_var("SOURCE_PHONE_NUMBER")?,
    })
}

fn storage_from_env() -> Option<RecordingStoreConfig> {
    Some(RecordingStoreConfig {
        api_url: env_var("RECORDING_STORE_URL")?,
        api_token: env_var("RECORDING_STORE_TOKEN")?,
        recording_prefix: env_var("RECORDING_PREFIX")
            .unwrap_or_else(|| "recordings/".to_string()),
    })
}

fn transcribe_from_env() -> Option<TranscribeConfig> {
    Some(TranscribeConfig {
        api_url: env_var("TRANSCRIBE_API_URL")?,
        api_token: env_var("TRANSCRIBE_API_TOKEN")?,
        language_code: env_var("TRANSCRIBE_LANGUAGE").unwrap_or_else(|| "es-ES".to_string()),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".callscribe");

    let config_file = find_config_file();

    let (file, base_dir) = match config_file {
        Some(ref config_path) => {
            let config = load_config_file(config_path)?;
            // Base directory is the parent of .callscribe/
            let base = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (Some(config), base)
        }
        None => (None, PathBuf::from(".")),
    };

    let home = if let Some(env_home) = env_var("CALLSCRIBE_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_deref()) {
        resolve_path(&base_dir, home_path)
    } else {
        default_home
    };

    let output_dir = if let Some(env_out) = env_var("CALLSCRIBE_OUTPUT") {
        PathBuf::from(env_out)
    } else if let Some(out_path) = file.as_ref().and_then(|f| f.paths.output.as_deref()) {
        resolve_path(&base_dir, out_path)
    } else {
        PathBuf::from("knowledge_output")
    };

    let voice = voice_from_env().or_else(|| file.as_ref().and_then(|f| f.voice.clone()));
    let storage = storage_from_env().or_else(|| file.as_ref().and_then(|f| f.storage.clone()));
    let transcribe =
        transcribe_from_env().or_else(|| file.as_ref().and_then(|f| f.transcribe.clone()));

    let limits = file
        .as_ref()
        .map(|f| f.interview.clone())
        .unwrap_or_default();

    Ok(ResolvedConfig {
        home,
        output_dir,
        voice,
        storage,
        transcribe,
        limits,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the callscribe home directory (lock file, session records).
pub fn callscribe_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the sessions directory ($CALLSCRIBE_HOME/sessions)
pub fn sessions_dir() -> Result<PathBuf> {
    Ok(config()?.home.join("sessions"))
}

/// Get the knowledge document output directory
pub fn output_dir() -> Result<PathBuf> {
    Ok(config()?.output_dir.clone())
}

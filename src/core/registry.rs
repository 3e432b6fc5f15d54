//! Session registry: single-owner handles for interview sessions.
//!
//! The registry is the only factory for `SessionHandle`s. It backs the
//! one-live-session invariant with an advisory file lock under the
//! callscribe home directory, so a second process (or a second handle in
//! the same process) cannot start an interview while one is running.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{InterviewResult, InterviewSession, SessionStatus};

/// Errors acquiring or recording a session.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("another interview session is already active (lock file: {0})")]
    Busy(PathBuf),

    #[error("session registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What gets written under `sessions/` once an interview finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: InterviewSession,
    pub result: InterviewResult,
}

/// Factory and index for interview sessions.
pub struct SessionRegistry {
    home: PathBuf,
}

impl SessionRegistry {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    fn lock_path(&self) -> PathBuf {
        self.home.join("session.lock")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.home.join("sessions")
    }

    /// Create the one live session, or fail if another handle holds the lock.
    pub fn acquire(
        &self,
        user_id: &str,
        phone_number: &str,
        language: &str,
    ) -> Result<SessionHandle, RegistryError> {
        std::fs::create_dir_all(&self.home)?;

        let lock_path = self.lock_path();
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;

        lock.try_lock_exclusive()
            .map_err(|_| RegistryError::Busy(lock_path))?;

        let session = InterviewSession::new(user_id, phone_number, language);
        info!(user_id, session_id = %session.id, "Session acquired");

        Ok(SessionHandle {
            session,
            lock,
            sessions_dir: self.sessions_dir(),
        })
    }

    /// Load recorded sessions, most recent first.
    pub fn list_records(&self) -> Result<Vec<SessionRecord>, RegistryError> {
        let dir = self.sessions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        // Filenames are timestamp-prefixed, so name order is time order.
        names.sort();
        names.reverse();

        let mut records = Vec::new();
        for path in names {
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session record"),
            }
        }

        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<SessionRecord, RegistryError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Exclusive owner of the live `InterviewSession`. Only the controller and
/// the delivery loop mutate the session through this handle; dropping it
/// releases the registry lock.
pub struct SessionHandle {
    session: InterviewSession,
    lock: File,
    sessions_dir: PathBuf,
}

impl SessionHandle {
    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut InterviewSession {
        &mut self.session
    }

    /// Mark the session terminal and persist its record under `sessions/`.
    pub fn finish(&mut self, result: &InterviewResult) -> Result<PathBuf, RegistryError> {
        self.session.status = if result.success {
            SessionStatus::Completed
        } else {
            SessionStatus::Failed
        };

        std::fs::create_dir_all(&self.sessions_dir)?;

        let name = format!(
            "{}-{}.json",
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.session.user_id
        );
        let path = self.sessions_dir.join(name);

        let record = SessionRecord {
            session: self.session.clone(),
            result: result.clone(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;

        info!(path = %path.display(), "Session record written");
        Ok(path)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            warn!(error = %e, "Failed to release session lock");
        }
    }
}

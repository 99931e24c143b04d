//! Durable session record.
//!
//! A single JSON file holding the four persisted session fields under a
//! top-level `state` key:
//!
//! ```json
//! {"state":{"user":{...},"token":"...","refreshToken":"...","isAuthenticated":true}}
//! ```
//!
//! Reads are synchronous. Writes are synchronous and best-effort: a failed
//! write is logged, never fatal. A corrupt or unreadable record is treated
//! as an empty session.

use super::Session;
use crate::api::models::User;
use crate::error::AuthError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// File name of the session record inside the data directory.
pub const STORAGE_FILE: &str = "auth-storage.json";

/// The persisted subset of [`Session`]. `is_loading` and `error` are
/// transient per-process state and never written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    user: Option<User>,
    token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    is_authenticated: bool,
}

/// On-disk wrapper: the payload lives under a single `state` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedRecord {
    state: PersistedState,
}

/// File-backed store for the persisted session fields.
pub struct SessionStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl SessionStore {
    /// Create a store over the given record path. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// Load the persisted session. Absence, unreadability, or corruption
    /// yields an empty session; this never fails.
    pub fn load(&self) -> Session {
        let _io = self.io.lock();
        self.read_unlocked()
    }

    /// Persist the four durable fields of `session`. Best-effort.
    pub fn save(&self, session: &Session) {
        let _io = self.io.lock();
        self.write_unlocked(session);
    }

    /// Remove the record entirely.
    pub fn clear(&self) {
        let _io = self.io.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to clear session storage");
            }
        }
    }

    /// Rewrite only the stored access token, leaving the rest of the record
    /// untouched. Used by the 401 interceptor after a successful refresh.
    pub fn update_access_token(&self, token: &str) {
        let _io = self.io.lock();
        let mut session = self.read_unlocked();
        if session.is_empty() {
            return;
        }
        session.access_token = Some(token.to_string());
        self.write_unlocked(&session);
    }

    fn read_unlocked(&self) -> Session {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Session::empty(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read session storage");
                return Session::empty();
            }
        };
        match parse_record(&raw) {
            Ok(record) => record_to_session(record),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "session storage corrupt, treating as empty");
                Session::empty()
            }
        }
    }

    fn write_unlocked(&self, session: &Session) {
        let record = PersistedRecord {
            state: PersistedState {
                user: session.user.clone(),
                token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
                is_authenticated: session.is_authenticated,
            },
        };
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to create session storage directory");
                return;
            }
        }
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize session record");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to write session storage");
        }
    }
}

fn parse_record(raw: &str) -> Result<PersistedRecord, AuthError> {
    Ok(serde_json::from_str(raw)?)
}

fn record_to_session(record: PersistedRecord) -> Session {
    let state = record.state;
    // A record claiming authentication without a full identity is treated
    // as empty rather than rehydrating a partial session.
    if state.is_authenticated && (state.user.is_none() || state.token.is_none()) {
        tracing::warn!("persisted session is partial, treating as empty");
        return Session::empty();
    }
    Session {
        user: state.user,
        access_token: state.token,
        refresh_token: state.refresh_token,
        is_authenticated: state.is_authenticated,
        is_loading: false,
        error: None,
    }
}

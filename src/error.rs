//! Error types for session and gateway operations.

use thiserror::Error;

/// Failures surfaced by the gateway client and the auth flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The remote API rejected the supplied credentials.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// A 401 that could not be recovered by a token refresh.
    #[error("session expired")]
    TokenExpired,

    /// An explicit refresh was requested but no refresh token is held.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// Transport-level failure (connect, TLS, timeout, body decode).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The persisted session record could not be parsed. Recovered inside
    /// the session store (treated as an empty session); callers of `load()`
    /// never see this.
    #[error("stored session unreadable: {0}")]
    StorageCorrupt(#[from] serde_json::Error),

    /// Any other non-2xx response from the remote API.
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },
}

impl AuthError {
    /// Human-readable message for display, with a per-operation fallback
    /// when the failure carries no message of its own.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Rejected { message, .. } | AuthError::Api { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            AuthError::TokenExpired => "Session expired, please login again".to_string(),
            AuthError::MissingRefreshToken => self.to_string(),
            _ => fallback.to_string(),
        }
    }
}

//! Gateway client for the remote user-management API.
//!
//! Every outbound request re-reads the current access token from the
//! persisted session store and attaches it as a bearer credential (a default
//! token registered at rehydrate/login time is the fallback). On a 401
//! response the client attempts exactly one token refresh, rewrites the
//! stored access token, and retries the original request once. A second 401
//! on the retried request is surfaced as-is: one refresh per request, never
//! more.
//!
//! Refreshes are scoped per request and not coalesced: concurrent requests
//! that each hit a 401 each issue their own refresh call. Deduplicating
//! those would be an improvement; the single-retry-per-request bound must
//! survive it.
//!
//! ## Adapter policy
//! The backing API has no registration, logout, or password endpoints.
//! `register` degrades to a demo login that preserves the caller-supplied
//! display fields; `logout` and the password operations resolve locally.
//! These degradations are part of the adapter contract, pending a backend
//! that supports them natively.

pub mod models;

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::routes::{Navigate, LOGIN};
use crate::session::SessionStore;
use models::{
    AuthResponse, AuthSessionWire, LoginRequest, RefreshRequest, RegisterProfile, User, UserWire,
    UsersPage, UsersPageWire,
};
use parking_lot::RwLock;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

/// Demo account used when `register` degrades to a demo login.
const DEMO_USERNAME: &str = "emilys";
const DEMO_PASSWORD: &str = "emilyspass";

/// Demo accounts known to the public demo backend: (username, password,
/// display name). Shown on the login view.
pub const DEMO_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("emilys", "emilyspass", "Emily Johnson"),
    ("michaelw", "michaelwpass", "Michael Williams"),
    ("sophiab", "sophiabpass", "Sophia Brown"),
];

/// HTTP client for the remote auth API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    expires_in_mins: u32,
    store: Arc<SessionStore>,
    default_token: RwLock<Option<String>>,
    navigator: RwLock<Option<Arc<dyn Navigate>>>,
}

impl ApiClient {
    /// Create a new gateway client.
    pub fn new(config: &ClientConfig, store: Arc<SessionStore>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            expires_in_mins: config.expires_in_mins,
            store,
            default_token: RwLock::new(None),
            navigator: RwLock::new(None),
        })
    }

    /// Install the navigation seam used to force a redirect to the login
    /// entry point when a refresh fails mid-request.
    pub fn set_navigator(&self, navigator: Arc<dyn Navigate>) {
        *self.navigator.write() = Some(navigator);
    }

    /// Register a default bearer token for subsequent requests.
    pub fn set_auth_token(&self, token: &str) {
        *self.default_token.write() = Some(token.to_string());
    }

    /// Drop the default bearer token.
    pub fn clear_auth_token(&self) {
        *self.default_token.write() = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current bearer token: the stored one, else the registered default.
    fn bearer_token(&self) -> Option<String> {
        self.store
            .load()
            .access_token
            .or_else(|| self.default_token.read().clone())
    }

    // ── Request pipeline ─────────────────────────────────────────

    /// Send a request with bearer attachment and the single-retry 401
    /// interceptor. Non-401 statuses are returned untouched for the caller
    /// to map; transport failures become [`AuthError::Network`].
    async fn send(
        &self,
        build: impl Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AuthError> {
        let mut request = build(&self.http);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // 401: try one refresh, then one retry. Without a stored refresh
        // token the original failure propagates.
        let Some(refresh_token) = self.store.load().refresh_token else {
            return Ok(response);
        };

        match self.refresh_token(&refresh_token).await {
            Ok(refreshed) => {
                self.store.update_access_token(&refreshed.token);
                tracing::debug!("access token refreshed after 401, retrying request");
                let retried = build(&self.http)
                    .bearer_auth(&refreshed.token)
                    .send()
                    .await?;
                // A second 401 here is surfaced as-is.
                Ok(retried)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, clearing session");
                self.store.clear();
                if let Some(navigator) = self.navigator.read().as_ref() {
                    navigator.force_navigate(LOGIN);
                }
                Err(err)
            }
        }
    }

    // ── Auth operations ──────────────────────────────────────────

    /// `POST /auth/login`: authenticate and return the normalized session.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            expires_in_mins: self.expires_in_mins,
        };
        let response = self
            .send(|http| http.post(self.url("/auth/login")).json(&body))
            .await?;
        let response = credentials_checked(response).await?;
        let wire: AuthSessionWire = response.json().await?;
        Ok(wire.into_auth_response())
    }

    /// Register a new account.
    ///
    /// The backend has no registration endpoint: performs a demo login and
    /// overlays the caller-supplied name and email on the returned identity.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, AuthError> {
        tracing::debug!("registration degraded to demo login (no remote endpoint)");
        let mut auth = self.login(DEMO_USERNAME, DEMO_PASSWORD).await?;
        auth.user.name = profile.name.clone();
        auth.user.email = profile.email.clone();
        Ok(auth)
    }

    /// Invalidate the session remotely. The backend has no logout endpoint,
    /// so this resolves locally; kept fallible for backends that have one.
    pub async fn logout(&self) -> Result<(), AuthError> {
        tracing::debug!("logout resolved locally (no remote endpoint)");
        Ok(())
    }

    /// `POST /auth/refresh`: exchange a refresh token for a new session.
    /// Issued outside the interceptor pipeline so a failing refresh can
    /// never trigger another refresh.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
            expires_in_mins: self.expires_in_mins,
        };
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            tracing::debug!(status, message = %message, "refresh rejected");
            return Err(AuthError::TokenExpired);
        }
        let wire: AuthSessionWire = response.json().await?;
        Ok(wire.into_auth_response())
    }

    /// `GET /auth/me`: the authenticated principal, normalized.
    pub async fn get_current_user(&self) -> Result<User, AuthError> {
        let response = self.send(|http| http.get(self.url("/auth/me"))).await?;
        let response = authed_checked(response).await?;
        let wire: UserWire = response.json().await?;
        Ok(wire.into_user())
    }

    /// `GET /users`: user listing for the dashboard.
    pub async fn list_users(&self) -> Result<UsersPage, AuthError> {
        let response = self.send(|http| http.get(self.url("/users"))).await?;
        let response = authed_checked(response).await?;
        let wire: UsersPageWire = response.json().await?;
        Ok(wire.into_users_page())
    }

    // ── Password operations (adapter mocks) ──────────────────────

    /// Request a password-reset email. No remote endpoint; resolves locally.
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        tracing::debug!(email, "forgot-password resolved locally (no remote endpoint)");
        Ok(format!("Password reset email sent to {email}"))
    }

    /// Redeem a reset token for a new password. No remote endpoint;
    /// resolves locally.
    pub async fn reset_password(
        &self,
        _token: &str,
        _new_password: &str,
    ) -> Result<String, AuthError> {
        tracing::debug!("reset-password resolved locally (no remote endpoint)");
        Ok("Password has been reset".to_string())
    }

    /// Change the current password. No remote endpoint; resolves locally.
    pub async fn change_password(
        &self,
        _current_password: &str,
        _new_password: &str,
    ) -> Result<String, AuthError> {
        tracing::debug!("change-password resolved locally (no remote endpoint)");
        Ok("Password changed".to_string())
    }
}

// ── Response mapping ─────────────────────────────────────────────

/// Map a credentials-endpoint response: non-2xx becomes
/// [`AuthError::Rejected`] carrying the remote message when present.
async fn credentials_checked(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let (status, message) = error_message(response).await;
    Err(AuthError::Rejected { status, message })
}

/// Map an authenticated-endpoint response: 401 becomes
/// [`AuthError::TokenExpired`] (the interceptor has already had its one
/// retry), any other non-2xx becomes [`AuthError::Api`].
async fn authed_checked(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(AuthError::TokenExpired);
    }
    let (status, message) = error_message(response).await;
    Err(AuthError::Api { status, message })
}

/// Pull the `message` field out of an error body, if there is one.
async fn error_message(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();
    (status, message)
}

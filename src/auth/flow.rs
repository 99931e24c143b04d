//! Operation flows over the gateway client and session state.
//!
//! Every operation follows the same contract: set the loading flag and clear
//! the previous error on start; apply the operation's session effect and
//! emit a success notice on success; extract a display message and set the
//! session error on failure; always drop the loading flag last.

use crate::api::models::{AuthResponse, RegisterProfile, User};
use crate::api::ApiClient;
use crate::error::AuthError;
use crate::notify::Notifier;
use crate::session::{SessionManager, SessionStore};
use std::sync::Arc;

/// Error message installed when a session can no longer be refreshed.
const SESSION_EXPIRED: &str = "Session expired, please login again";

/// Coordinates auth operations against the gateway client.
pub struct Authenticator {
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
    store: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl Authenticator {
    pub fn new(
        api: Arc<ApiClient>,
        session: Arc<SessionManager>,
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            store,
            notifier,
        }
    }

    /// Authenticate with username and password. On success the full session
    /// is replaced and the bearer token registered with the gateway client.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        self.begin();
        let result = self.api.login(username, password).await;
        let outcome = match result {
            Ok(auth) => {
                let user = self.install_session(auth);
                self.notifier.success("Signed in");
                Ok(user)
            }
            Err(err) => Err(self.fail(err, "Login failed")),
        };
        self.session.set_loading(false);
        outcome
    }

    /// Create an account. Follows the gateway's documented degradation on
    /// backends without a registration endpoint.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<User, AuthError> {
        self.begin();
        let result = self.api.register(profile).await;
        let outcome = match result {
            Ok(auth) => {
                let user = self.install_session(auth);
                self.notifier.success("Account created");
                Ok(user)
            }
            Err(err) => Err(self.fail(err, "Registration failed")),
        };
        self.session.set_loading(false);
        outcome
    }

    /// Sign out. The local session is invalidated even when the remote call
    /// fails; network failure never blocks logout.
    pub async fn logout(&self) {
        self.begin();
        let result = self.api.logout().await;

        self.session.clear_auth();
        self.api.clear_auth_token();

        match result {
            Ok(()) => self.notifier.success("Signed out"),
            Err(err) => {
                let message = err.user_message("Logout failed");
                tracing::warn!(error = %err, "remote logout failed, local session cleared anyway");
                self.session.set_error(Some(message.clone()));
                self.notifier.error(&message);
            }
        }
        self.session.set_loading(false);
    }

    /// Explicit refresh: exchange the held refresh token for a new session.
    /// Fails immediately without a token. On failure the session is cleared
    /// and the error re-raised so callers can react.
    pub async fn refresh_auth(&self) -> Result<(), AuthError> {
        // The in-memory token wins; the stored one covers the mount-time
        // path where storage holds a session the process has not loaded.
        let refresh_token = self
            .session
            .snapshot()
            .refresh_token
            .or_else(|| self.store.load().refresh_token);
        let Some(refresh_token) = refresh_token else {
            self.expire_session();
            return Err(AuthError::MissingRefreshToken);
        };

        self.session.set_loading(true);
        let result = self.api.refresh_token(&refresh_token).await;
        let outcome = match result {
            Ok(auth) => {
                self.install_session(auth);
                Ok(())
            }
            Err(err) => {
                self.expire_session();
                Err(err)
            }
        };
        self.session.set_loading(false);
        outcome
    }

    /// Request a password-reset email.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.begin();
        let result = self.api.forgot_password(email).await;
        let outcome = match result {
            Ok(message) => {
                self.notifier.success(&message);
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to send password reset email")),
        };
        self.session.set_loading(false);
        outcome
    }

    /// Redeem a reset token for a new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        self.begin();
        let result = self.api.reset_password(token, new_password).await;
        let outcome = match result {
            Ok(message) => {
                self.notifier.success(&message);
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to reset password")),
        };
        self.session.set_loading(false);
        outcome
    }

    /// Change the current password.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.begin();
        let result = self
            .api
            .change_password(current_password, new_password)
            .await;
        let outcome = match result {
            Ok(message) => {
                self.notifier.success(&message);
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to change password")),
        };
        self.session.set_loading(false);
        outcome
    }

    /// Fetch the authenticated principal through the gateway.
    pub async fn current_user(&self) -> Result<User, AuthError> {
        self.api.get_current_user().await
    }

    // ── Shared steps ─────────────────────────────────────────────

    fn begin(&self) {
        self.session.set_loading(true);
        self.session.set_error(None);
    }

    fn install_session(&self, auth: AuthResponse) -> User {
        self.session
            .set_auth(auth.user.clone(), auth.token.clone(), auth.refresh_token);
        self.api.set_auth_token(&auth.token);
        auth.user
    }

    fn fail(&self, err: AuthError, fallback: &str) -> AuthError {
        let message = err.user_message(fallback);
        self.session.set_error(Some(message.clone()));
        self.notifier.error(&message);
        err
    }

    fn expire_session(&self) {
        self.session.clear_auth();
        self.api.clear_auth_token();
        self.session.set_error(Some(SESSION_EXPIRED.to_string()));
    }
}

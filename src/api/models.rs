//! Wire shapes of the remote API and the adapters that normalize them.
//!
//! The remote returns flat user records with numeric ids and split name
//! fields. Everything handed to the rest of the crate is the normalized
//! [`User`] shape: string id, concatenated display name, `avatar` taken from
//! the upstream image URL, fixed `"user"` role, and RFC 3339 timestamps
//! minted client-side at adaptation time.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Normalized identity of an authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Normalized result of login, registration, or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

/// Caller-supplied registration profile.
#[derive(Debug, Clone)]
pub struct RegisterProfile {
    pub name: String,
    pub email: String,
    pub password: String,
}

// ── Wire shapes ──────────────────────────────────────────────────

/// `POST /auth/login` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub expires_in_mins: u32,
}

/// `POST /auth/refresh` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub expires_in_mins: u32,
}

/// Flat user record as returned by the remote API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWire {
    /// Numeric upstream; coerced to a string on adaptation.
    pub id: serde_json::Value,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Login/refresh response: user fields flattened next to the token pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSessionWire {
    #[serde(flatten)]
    pub user: UserWire,
    pub token: String,
    pub refresh_token: String,
}

/// Paged listing returned by `GET /users`.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersPageWire {
    pub users: Vec<UserWire>,
    #[serde(default)]
    pub total: u64,
}

/// Normalized user listing for the dashboard.
#[derive(Debug, Clone)]
pub struct UsersPage {
    pub users: Vec<User>,
    pub total: u64,
}

// ── Adapters ─────────────────────────────────────────────────────

impl UserWire {
    /// Normalize a wire record into a [`User`].
    pub fn into_user(self) -> User {
        let now = Utc::now().to_rfc3339();
        User {
            id: coerce_id(&self.id),
            name: format!("{} {}", self.first_name, self.last_name),
            email: self.email,
            avatar: self.image,
            role: "user".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl AuthSessionWire {
    /// Normalize a login/refresh response.
    pub fn into_auth_response(self) -> AuthResponse {
        AuthResponse {
            user: self.user.into_user(),
            token: self.token,
            refresh_token: self.refresh_token,
        }
    }
}

impl UsersPageWire {
    /// Normalize a user listing.
    pub fn into_users_page(self) -> UsersPage {
        UsersPage {
            users: self.users.into_iter().map(UserWire::into_user).collect(),
            total: self.total,
        }
    }
}

/// Coerce an upstream id (usually numeric) to a string.
fn coerce_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Auth operation flows.
//!
//! Coordinates the gateway client, the session manager, and user-visible
//! notifications for login, registration, logout, refresh, and the password
//! operations.

mod flow;

pub use flow::Authenticator;

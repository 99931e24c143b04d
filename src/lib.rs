//! Turnstile: terminal client for a remote user-management API.
//!
//! Provides:
//! - Persistent session storage that survives restarts (`session::store`)
//! - Reactive in-memory session state with observers (`session::state`)
//! - A gateway client that attaches bearer tokens and recovers from a 401
//!   with exactly one token refresh per request (`api`)
//! - Operation flows for login, registration, logout, refresh, and password
//!   management (`auth`)
//! - Route-guard decisions gating the protected views (`routes`)

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

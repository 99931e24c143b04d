//! Navigation surface and route guard.
//!
//! Pure decision logic: given the session state and a route's declared auth
//! requirement, decide whether to render, show the loading placeholder, or
//! redirect. Rendering itself belongs to the caller.
//!
//! ## Route table
//! - `/login`, `/register`: public, bounce authenticated users away
//! - `/dashboard`: protected
//! - `/`: forwards to `/dashboard`
//! - anything else: forwards to `/login`

use crate::auth::Authenticator;
use crate::session::{SessionManager, SessionStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Login entry point.
pub const LOGIN: &str = "/login";
/// Registration page.
pub const REGISTER: &str = "/register";
/// Protected dashboard.
pub const DASHBOARD: &str = "/dashboard";

/// Seam through which the gateway client forces a hard redirect when the
/// session is irrecoverably lost mid-request.
pub trait Navigate: Send + Sync {
    fn force_navigate(&self, path: &str);
}

/// A page route and its declared auth requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: &'static str,
    pub requires_auth: bool,
}

/// Result of resolving a requested path against the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The path maps to a page.
    Page(RouteSpec),
    /// The path unconditionally forwards elsewhere.
    Forward(&'static str),
}

/// Resolve a requested path against the route table.
pub fn resolve(path: &str) -> Resolution {
    match path {
        LOGIN => Resolution::Page(RouteSpec {
            path: LOGIN,
            requires_auth: false,
        }),
        REGISTER => Resolution::Page(RouteSpec {
            path: REGISTER,
            requires_auth: false,
        }),
        DASHBOARD => Resolution::Page(RouteSpec {
            path: DASHBOARD,
            requires_auth: true,
        }),
        "/" => Resolution::Forward(DASHBOARD),
        _ => Resolution::Forward(LOGIN),
    }
}

/// Per-navigation decision produced by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// An auth-affecting operation is in flight; render a placeholder and
    /// re-evaluate on the next state change.
    Loading,
    /// Unauthenticated on a protected route. The attempted destination has
    /// been remembered for a post-login return.
    RedirectToLogin,
    /// Authenticated on a public route; forward to the remembered
    /// destination, or the dashboard.
    Redirect { to: String },
    /// Render the requested page.
    Render,
}

/// Gates page rendering on session state and the route's requirement.
pub struct RouteGuard {
    session: Arc<SessionManager>,
    store: Arc<SessionStore>,
    remembered: Mutex<Option<String>>,
    mounted: AtomicBool,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionManager>, store: Arc<SessionStore>) -> Self {
        Self {
            session,
            store,
            remembered: Mutex::new(None),
            mounted: AtomicBool::new(false),
        }
    }

    /// Evaluate one navigation against the current session state.
    pub fn evaluate(&self, route: RouteSpec) -> GuardDecision {
        let session = self.session.snapshot();

        if session.is_loading {
            return GuardDecision::Loading;
        }
        if route.requires_auth && !session.is_authenticated {
            *self.remembered.lock() = Some(route.path.to_string());
            return GuardDecision::RedirectToLogin;
        }
        if !route.requires_auth && session.is_authenticated {
            let to = self
                .remembered
                .lock()
                .take()
                .unwrap_or_else(|| DASHBOARD.to_string());
            return GuardDecision::Redirect { to };
        }
        GuardDecision::Render
    }

    /// The remembered pre-auth destination, if any.
    pub fn remembered(&self) -> Option<String> {
        self.remembered.lock().clone()
    }

    /// Seed the remembered destination.
    pub fn remember(&self, path: &str) {
        *self.remembered.lock() = Some(path.to_string());
    }

    /// Mount-time hook, runs at most once per process: when durable storage
    /// holds a refresh token but the in-memory state is neither
    /// authenticated nor loading, trigger one opportunistic refresh.
    /// Failure is swallowed; the state already reflects logged-out.
    pub async fn on_mount(&self, auth: &Authenticator) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = self.session.snapshot();
        if session.is_authenticated || session.is_loading {
            return;
        }
        if self.store.load().refresh_token.is_none() {
            return;
        }
        if let Err(err) = auth.refresh_auth().await {
            tracing::debug!(error = %err, "opportunistic refresh failed, staying logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::User;
    use crate::session::STORAGE_FILE;
    use tempfile::TempDir;

    fn guard_env() -> (TempDir, Arc<SessionManager>, RouteGuard) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(tmp.path().join(STORAGE_FILE)));
        let session = Arc::new(SessionManager::new(store.clone()));
        let guard = RouteGuard::new(session.clone(), store);
        (tmp, session, guard)
    }

    fn sample_user() -> User {
        User {
            id: "1".into(),
            name: "Emily Johnson".into(),
            email: "emily@x.com".into(),
            avatar: None,
            role: "user".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn page(path: &str) -> RouteSpec {
        match resolve(path) {
            Resolution::Page(spec) => spec,
            Resolution::Forward(to) => panic!("{path} forwards to {to}"),
        }
    }

    #[test]
    fn route_table() {
        assert_eq!(
            resolve("/dashboard"),
            Resolution::Page(RouteSpec {
                path: DASHBOARD,
                requires_auth: true
            })
        );
        assert!(!page("/login").requires_auth);
        assert!(!page("/register").requires_auth);
        assert_eq!(resolve("/"), Resolution::Forward(DASHBOARD));
        assert_eq!(resolve("/no-such-page"), Resolution::Forward(LOGIN));
    }

    #[test]
    fn loading_wins_regardless_of_auth() {
        let (_tmp, session, guard) = guard_env();
        session.set_loading(true);
        assert_eq!(guard.evaluate(page("/dashboard")), GuardDecision::Loading);

        session.set_auth(sample_user(), "t1".into(), "r1".into());
        session.set_loading(true);
        assert_eq!(guard.evaluate(page("/login")), GuardDecision::Loading);
    }

    #[test]
    fn protected_route_redirects_and_remembers() {
        let (_tmp, _session, guard) = guard_env();
        assert_eq!(
            guard.evaluate(page("/dashboard")),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(guard.remembered().as_deref(), Some("/dashboard"));
    }

    #[test]
    fn authenticated_on_public_route_goes_to_dashboard() {
        let (_tmp, session, guard) = guard_env();
        session.set_auth(sample_user(), "t1".into(), "r1".into());
        assert_eq!(
            guard.evaluate(page("/login")),
            GuardDecision::Redirect {
                to: DASHBOARD.into()
            }
        );
    }

    #[test]
    fn remembered_destination_wins_over_dashboard() {
        let (_tmp, session, guard) = guard_env();
        session.set_auth(sample_user(), "t1".into(), "r1".into());
        guard.remember("/settings");
        assert_eq!(
            guard.evaluate(page("/login")),
            GuardDecision::Redirect {
                to: "/settings".into()
            }
        );
        // Consumed by the redirect.
        assert!(guard.remembered().is_none());
    }

    #[test]
    fn matching_requirement_renders() {
        let (_tmp, session, guard) = guard_env();
        assert_eq!(guard.evaluate(page("/login")), GuardDecision::Render);

        session.set_auth(sample_user(), "t1".into(), "r1".into());
        assert_eq!(guard.evaluate(page("/dashboard")), GuardDecision::Render);
    }

    mod mount {
        use super::*;
        use crate::api::ApiClient;
        use crate::notify::Notifier;
        use crate::session::Session;
        use crate::testutil::{stub_config, RecordingNotifier, StubApi};
        use std::sync::atomic::Ordering as AtomicOrdering;

        async fn mount_env(
            stub: &StubApi,
            stored: Option<Session>,
        ) -> (TempDir, Arc<SessionManager>, RouteGuard, Authenticator) {
            let tmp = TempDir::new().unwrap();
            let store = Arc::new(SessionStore::new(tmp.path().join(STORAGE_FILE)));
            if let Some(session) = stored {
                store.save(&session);
            }
            let session = Arc::new(SessionManager::new(store.clone()));
            let api =
                Arc::new(ApiClient::new(&stub_config(stub, tmp.path()), store.clone()).unwrap());
            let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
            let auth = Authenticator::new(api, session.clone(), store.clone(), notifier);
            let guard = RouteGuard::new(session.clone(), store);
            (tmp, session, guard, auth)
        }

        fn stored_session(refresh_token: &str) -> Session {
            Session {
                user: Some(sample_user()),
                access_token: Some("stale".into()),
                refresh_token: Some(refresh_token.into()),
                is_authenticated: true,
                is_loading: false,
                error: None,
            }
        }

        #[tokio::test]
        async fn refreshes_when_storage_holds_a_token() {
            let stub = StubApi::spawn().await;
            let (_tmp, session, guard, auth) =
                mount_env(&stub, Some(stored_session("r1"))).await;
            assert!(!session.snapshot().is_authenticated);

            guard.on_mount(&auth).await;

            let snapshot = session.snapshot();
            assert!(snapshot.is_authenticated);
            assert_eq!(snapshot.access_token.as_deref(), Some("t2"));
        }

        #[tokio::test]
        async fn swallows_refresh_failure() {
            let stub = StubApi::spawn().await;
            let (_tmp, session, guard, auth) =
                mount_env(&stub, Some(stored_session("revoked"))).await;

            guard.on_mount(&auth).await;

            let snapshot = session.snapshot();
            assert!(!snapshot.is_authenticated);
            assert!(snapshot.user.is_none());
        }

        #[tokio::test]
        async fn runs_at_most_once() {
            let stub = StubApi::spawn().await;
            let (_tmp, _session, guard, auth) =
                mount_env(&stub, Some(stored_session("r1"))).await;

            guard.on_mount(&auth).await;
            guard.on_mount(&auth).await;
            assert_eq!(stub.state.refresh_calls.load(AtomicOrdering::SeqCst), 1);
        }

        #[tokio::test]
        async fn skips_without_stored_refresh_token() {
            let stub = StubApi::spawn().await;
            let (_tmp, session, guard, auth) = mount_env(&stub, None).await;

            guard.on_mount(&auth).await;

            assert!(session.snapshot().is_empty());
            assert_eq!(stub.state.refresh_calls.load(AtomicOrdering::SeqCst), 0);
        }
    }
}

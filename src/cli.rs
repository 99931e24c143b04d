//! Command-line surface.
//!
//! Every view command goes through the route guard: `open` resolves the
//! requested path against the route table, follows redirects, and renders
//! the page the guard settles on. Auth commands drive the operation flows
//! directly.

use crate::api::{ApiClient, DEMO_ACCOUNTS};
use crate::auth::Authenticator;
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::notify::{ConsoleNotifier, Notifier};
use crate::routes::{self, GuardDecision, Navigate, Resolution, RouteGuard, DASHBOARD, LOGIN};
use crate::session::{SessionManager, SessionStore};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "turnstile", version, about = "Terminal client for a remote user-management API")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and open the dashboard
    Login {
        #[arg(long)]
        username: Option<String>,
        /// Password (prompted interactively when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account (demo backend: degrades to a demo sign-in)
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Open a path through the route guard
    Open { path: String },
    /// Open the protected dashboard
    Dashboard,
    /// Show the authenticated identity
    Whoami,
    /// Exchange the refresh token for a new session
    Refresh,
    /// Sign out and clear the stored session
    Logout,
    /// Show session status
    Status,
    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Reset a password with an emailed token
    ResetPassword {
        #[arg(long)]
        token: String,
    },
    /// Change the current password
    ChangePassword,
}

/// Wired-up application components.
struct App {
    config: ClientConfig,
    session: Arc<SessionManager>,
    api: Arc<ApiClient>,
    auth: Authenticator,
    guard: RouteGuard,
}

/// Prints the forced redirect issued when a refresh fails mid-request.
struct CliNavigator;

impl Navigate for CliNavigator {
    fn force_navigate(&self, path: &str) {
        eprintln!(
            "{} session expired, continue at {}",
            style("!").yellow().bold(),
            style(path).bold()
        );
    }
}

/// Parse arguments, wire the components, and run one command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load()?;

    let store = Arc::new(SessionStore::new(config.session_path()));
    let session = Arc::new(SessionManager::new(store.clone()));
    let api = Arc::new(ApiClient::new(&config, store.clone())?);
    api.set_navigator(Arc::new(CliNavigator));

    // Explicit two-step rehydration: pure load, then push into memory and
    // register the bearer token.
    session.rehydrate(&api);

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let auth = Authenticator::new(api.clone(), session.clone(), store.clone(), notifier);
    let guard = RouteGuard::new(session.clone(), store.clone());

    let app = App {
        config,
        session,
        api,
        auth,
        guard,
    };
    app.dispatch(cli.command).await
}

impl App {
    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { username, password } => self.login(username, password).await,
            Command::Register {
                name,
                email,
                password,
            } => self.register(name, email, password).await,
            Command::Open { path } => self.open(&path).await,
            Command::Dashboard => self.open(DASHBOARD).await,
            Command::Whoami => self.whoami().await,
            Command::Refresh => self.refresh().await,
            Command::Logout => {
                self.auth.logout().await;
                Ok(())
            }
            Command::Status => self.status(),
            Command::ForgotPassword { email } => {
                fail_quietly(self.auth.forgot_password(&email).await)
            }
            Command::ResetPassword { token } => {
                let new_password = prompt_password("New password")?;
                fail_quietly(self.auth.reset_password(&token, &new_password).await)
            }
            Command::ChangePassword => {
                let current = prompt_password("Current password")?;
                let new_password = prompt_password("New password")?;
                fail_quietly(self.auth.change_password(&current, &new_password).await)
            }
        }
    }

    // ── Auth commands ────────────────────────────────────────────

    async fn login(&self, username: Option<String>, password: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => dialoguer::Input::new()
                .with_prompt("Username")
                .interact_text()?,
        };
        let password = match password {
            Some(password) => password,
            None => prompt_password("Password")?,
        };

        if self.auth.login(&username, &password).await.is_err() {
            std::process::exit(1);
        }

        // Post-login return: the destination remembered by the guard, or
        // the dashboard.
        let destination = self
            .guard
            .remembered()
            .unwrap_or_else(|| DASHBOARD.to_string());
        self.open(&destination).await
    }

    async fn register(
        &self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        let name = match name {
            Some(name) => name,
            None => dialoguer::Input::new().with_prompt("Name").interact_text()?,
        };
        let email = match email {
            Some(email) => email,
            None => dialoguer::Input::new()
                .with_prompt("Email")
                .interact_text()?,
        };
        let password = match password {
            Some(password) => password,
            None => prompt_password("Password")?,
        };

        let profile = crate::api::models::RegisterProfile {
            name,
            email,
            password,
        };
        if self.auth.register(&profile).await.is_err() {
            std::process::exit(1);
        }
        self.open(DASHBOARD).await
    }

    async fn whoami(&self) -> Result<()> {
        if !self.session.snapshot().is_authenticated {
            bail!("not signed in, run `turnstile login`");
        }
        match self.auth.current_user().await {
            Ok(user) => {
                println!("{} <{}> ({})", style(&user.name).bold(), user.email, user.role);
                Ok(())
            }
            Err(AuthError::TokenExpired) => bail!("session expired, run `turnstile login`"),
            Err(err) => Err(err.into()),
        }
    }

    async fn refresh(&self) -> Result<()> {
        match self.auth.refresh_auth().await {
            Ok(()) => {
                println!("{} session refreshed", style("ok").green().bold());
                Ok(())
            }
            Err(err) => bail!("{}", err.user_message("Refresh failed")),
        }
    }

    fn status(&self) -> Result<()> {
        let session = self.session.snapshot();
        println!("storage:        {}", self.config.session_path().display());
        println!("api:            {}", self.config.base_url);
        println!(
            "authenticated:  {}",
            if session.is_authenticated { "yes" } else { "no" }
        );
        if let Some(user) = &session.user {
            println!("user:           {} <{}>", user.name, user.email);
        }
        println!(
            "access token:   {}",
            if session.access_token.is_some() { "present" } else { "none" }
        );
        println!(
            "refresh token:  {}",
            if session.refresh_token.is_some() { "present" } else { "none" }
        );
        if let Some(error) = &session.error {
            println!("last error:     {error}");
        }
        Ok(())
    }

    // ── Navigation ───────────────────────────────────────────────

    /// Resolve a path and render whatever the guard settles on.
    async fn open(&self, requested: &str) -> Result<()> {
        self.guard.on_mount(&self.auth).await;

        let mut path = requested.to_string();
        // The route table is a handful of entries; a short fuse guards
        // against a redirect cycle.
        for _ in 0..8 {
            let spec = match routes::resolve(&path) {
                Resolution::Forward(to) => {
                    path = to.to_string();
                    continue;
                }
                Resolution::Page(spec) => spec,
            };
            match self.guard.evaluate(spec) {
                GuardDecision::Loading => {
                    println!("{}", style("Loading...").dim());
                    return Ok(());
                }
                GuardDecision::RedirectToLogin => {
                    path = LOGIN.to_string();
                }
                GuardDecision::Redirect { to } => {
                    path = to;
                }
                GuardDecision::Render => return self.render(spec.path).await,
            }
        }
        bail!("navigation did not settle on a page");
    }

    async fn render(&self, path: &str) -> Result<()> {
        match path {
            routes::LOGIN => {
                self.render_login();
                Ok(())
            }
            routes::REGISTER => {
                self.render_register();
                Ok(())
            }
            routes::DASHBOARD => self.render_dashboard().await,
            other => bail!("no view for {other}"),
        }
    }

    fn render_login(&self) {
        println!("{}", style("Sign in").bold().underlined());
        println!("Run `turnstile login` to authenticate.\n");
        println!("{}", style("Demo credentials").bold());
        for (username, password, name) in DEMO_ACCOUNTS {
            println!("  {:<22} {} / {}", name, username, password);
        }
        if let Some(error) = self.session.snapshot().error {
            eprintln!("\n{} {}", style("error").red().bold(), error);
        }
    }

    fn render_register(&self) {
        println!("{}", style("Create an account").bold().underlined());
        println!("Run `turnstile register` to sign up.");
        println!(
            "{}",
            style("Note: the demo backend has no registration endpoint; a demo session is used.")
                .dim()
        );
    }

    async fn render_dashboard(&self) -> Result<()> {
        let user = match self.auth.current_user().await {
            Ok(user) => user,
            Err(AuthError::TokenExpired) => {
                // The gateway already cleared storage and pointed at /login.
                self.session.clear_auth();
                bail!("session expired, run `turnstile login`");
            }
            Err(err) => return Err(err.into()),
        };

        println!("{}", style("Dashboard").bold().underlined());
        println!("Signed in as {} <{}>\n", style(&user.name).bold(), user.email);

        match self.api.list_users().await {
            Ok(page) => {
                println!("{} ({} total)", style("Users").bold(), page.total);
                for user in &page.users {
                    println!("  {:<24} {:<28} {}", user.name, user.email, user.role);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "user listing unavailable");
                println!("{}", style("User listing unavailable").dim());
            }
        }
        Ok(())
    }
}

fn prompt_password(prompt: &str) -> Result<String> {
    Ok(dialoguer::Password::new().with_prompt(prompt).interact()?)
}

/// Auth flows already notify on failure; exit nonzero without a duplicate
/// error report.
fn fail_quietly<T>(result: Result<T, AuthError>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(_) => std::process::exit(1),
    }
}

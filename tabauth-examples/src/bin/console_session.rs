//! Drives a session from the terminal, standing in for a browser UI.
//!
//! Commands: `login`, `logout`, `token`, `roles`, `clear`, `user <username>`,
//! `fail-login`, `expire`, `quit`.

use std::sync::Arc;
use tabauth::providers::dev::{DevProvider, DevUser};
use tabauth::url::Url;
use tabauth::{AuthConfig, AuthError, ProviderError, Session, SessionManager};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Renders the header widget: a sign-in button when signed out, name and role badges otherwise.
fn render(session: &Session) -> String {
    let mut out = match session.account() {
        None => "[Sign In]".to_string(),
        Some(account) => {
            let mut parts = vec![account.display_name().to_string()];
            parts.extend(
                session
                    .capabilities()
                    .roles
                    .iter()
                    .map(|role| format!("<{}>", role)),
            );
            parts.push("[Sign Out]".to_string());
            parts.join(" ")
        }
    };
    if let Some(error) = session.error() {
        out.push_str(&format!("  ! {}", error.user_message()));
    }
    out
}

fn load_config() -> Result<AuthConfig, Box<dyn std::error::Error>> {
    let origin = Url::parse(
        &std::env::var("TABAUTH_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
    )?;
    match AuthConfig::from_env(origin.clone()) {
        Ok(config) => Ok(config),
        Err(AuthError::Configuration(reason)) => {
            log::warn!("{}; falling back to a local dev client", reason);
            let config = AuthConfig::new("00000000-0000-0000-0000-000000000000", origin);
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = load_config()?;
    println!("Authority: {}", config.authority());

    let provider = Arc::new(
        DevProvider::new()
            .with_tenant(config.tenant())
            .with_user(DevUser::new("ada@example.com", "Ada Lovelace", ["Admin", "Viewer"]))
            .with_user(DevUser::new("ed@example.com", "Ed Itor", ["Editor"]))
            .with_user(DevUser::new("guest@example.com", "Guest", Vec::<String>::new())),
    );
    let session = Arc::new(SessionManager::new(provider.clone(), &config));

    let mut watcher = session.subscribe();
    tokio::spawn(async move {
        while watcher.changed().await {
            println!("  {}", render(&watcher.snapshot()));
        }
    });

    println!("{}", render(&session.snapshot()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("login"), _) => session.login().await,
            (Some("logout"), _) => session.logout().await,
            (Some("token"), _) => match session.access_token().await {
                Some(token) => println!("token: {}", token.secret()),
                None => println!("no token available right now"),
            },
            (Some("roles"), _) => {
                let caps = session.capabilities();
                println!(
                    "admin={} editor={} viewer={} can_edit={} can_manage={} any={}",
                    caps.is_admin,
                    caps.is_editor,
                    caps.is_viewer,
                    caps.can_edit,
                    caps.can_manage,
                    caps.has_any_role
                );
            }
            (Some("clear"), _) => session.clear_error(),
            (Some("user"), Some(username)) => {
                if !provider.select_user(username) {
                    println!("unknown dev user: {}", username);
                }
            }
            (Some("fail-login"), _) => provider.fail_next_sign_in(ProviderError::Cancelled),
            (Some("expire"), _) => provider.expire_sessions(),
            (Some("quit"), _) => break,
            (None, _) => {}
            (Some(other), _) => println!("unknown command: {}", other),
        }
    }

    session.dispose();
    Ok(())
}

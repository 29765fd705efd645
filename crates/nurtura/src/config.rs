//! CLI configuration: thin wrapper around `nurtura_config`.
//!
//! Resolves the active profile and token with `GlobalOpts` overrides
//! (`--api-url`, `--token`, `--timeout`) and builds the `DashboardContext`
//! every backend command runs against.

use std::sync::Arc;

use secrecy::SecretString;

use nurtura_config::{Config, Profile};
use nurtura_core::{DashboardConfig, DashboardContext, MemorySessionStore, Role, Session, SessionUser};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::TerminalNotifier;

// ── Re-exports from shared crate ────────────────────────────────────

pub use nurtura_config::{config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Translate the config file plus global flags into a `DashboardConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_dashboard_config(
    cfg: &Config,
    profile: Option<&Profile>,
    global: &GlobalOpts,
) -> Result<DashboardConfig, CliError> {
    let mut profile = profile.cloned().unwrap_or_default();
    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout_secs = Some(timeout);
    }

    Ok(nurtura_config::to_dashboard_config(cfg, Some(&profile))?)
}

/// Resolve the access token: `--token` first, then the shared chain.
fn resolve_token(
    profile: Option<&Profile>,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SecretString, CliError> {
    if let Some(ref token) = global.token {
        return Ok(SecretString::from(token.clone()));
    }
    Ok(nurtura_config::resolve_token(profile, profile_name)?)
}

/// Build the session the private client reads its bearer token from.
///
/// The CLI never sees the identity provider's user record; the session user
/// is a stand-in carrying the profile's email.
fn cli_session(token: SecretString, profile: Option<&Profile>, profile_name: &str) -> Session {
    let email = profile
        .and_then(|p| p.email.clone())
        .unwrap_or_default();
    Session::new(
        token,
        SessionUser {
            id: format!("cli:{profile_name}"),
            email,
            name: None,
            role: Role::Admin,
        },
    )
}

/// Build a dashboard context for one CLI invocation.
///
/// `anonymous` commands only use the public client and skip token
/// resolution entirely.
pub fn build_context(global: &GlobalOpts, anonymous: bool) -> Result<DashboardContext, CliError> {
    let cfg = nurtura_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);
    let profile = cfg.profile(global.profile.as_deref())?;

    let dashboard = resolve_dashboard_config(&cfg, profile, global)?;

    let store = if anonymous {
        MemorySessionStore::new()
    } else {
        let token = resolve_token(profile, &profile_name, global)?;
        MemorySessionStore::with_session(cli_session(token, profile, &profile_name))
    };

    let notifier = TerminalNotifier::new(global);
    let ctx = DashboardContext::new(dashboard, Arc::new(store), Arc::new(notifier))?;
    Ok(ctx)
}

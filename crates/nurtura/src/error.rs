//! CLI error types with miette diagnostics.
//!
//! Maps configuration, context and normalized request failures into
//! user-facing errors with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nurtura_config::ConfigError;
use nurtura_core::{CoreError, ErrorKind, NormalizedError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(nurtura::connection_failed),
        help(
            "Check that the API is reachable and the URL is right.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(nurtura::network),
        help("The request never reached the API. Check your network and try again.")
    )]
    Network { message: String },

    #[error("{message} (request timed out)")]
    #[diagnostic(
        code(nurtura::timeout),
        help("Increase the timeout with --timeout or check API responsiveness.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Session rejected by the API")]
    #[diagnostic(
        code(nurtura::auth_failed),
        help(
            "The access token is missing, expired or revoked.\n\
             Store a fresh one with: nurtura config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(nurtura::no_credentials),
        help(
            "Configure a token with: nurtura config set-token\n\
             Or set the NURTURA_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(nurtura::not_found),
        help("Run: nurtura {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(nurtura::rejected))]
    Rejected { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(nurtura::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nurtura::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(nurtura::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: nurtura config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API URL configured")]
    #[diagnostic(
        code(nurtura::no_config),
        help(
            "Create a config with: nurtura config init\n\
             Or pass --api-url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(nurtura::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(nurtura::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(nurtura::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(nurtura::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Network { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::Rejected { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Rejected { status: 403, .. } => exit_code::PERMISSION,
            Self::Rejected { status: 409, .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Turn a 404 into a `NotFound` naming the resource.
    pub fn or_not_found(self, resource_type: &str, identifier: &str, list_command: &str) -> Self {
        match self {
            Self::Rejected { status: 404, .. } => Self::NotFound {
                resource_type: resource_type.into(),
                identifier: identifier.into(),
                list_command: list_command.into(),
            },
            other => other,
        }
    }
}

// ── Normalized request failures ──────────────────────────────────────

impl From<NormalizedError> for CliError {
    fn from(err: NormalizedError) -> Self {
        let message = err.message().to_owned();
        match err.kind() {
            ErrorKind::Network => CliError::Network { message },
            ErrorKind::Timeout => CliError::Timeout { message },
            ErrorKind::Unauthorized => CliError::AuthFailed {
                profile: "current".into(),
            },
            ErrorKind::Rejected { status } => CliError::Rejected { status, message },
            ErrorKind::Server { .. } | ErrorKind::Unknown => CliError::ApiError { message },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoSession | CoreError::Unauthorized => CliError::AuthFailed {
                profile: "current".into(),
            },
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                message: format!("No response within {timeout_secs}s"),
            },
            CoreError::Api { message, status } => match status {
                Some(status) if (400..500).contains(&status) => {
                    CliError::Rejected { status, message }
                }
                _ => CliError::ApiError { message },
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoApiUrl => CliError::NoConfig {
                path: nurtura_config::config_path().display().to_string(),
            },
            ConfigError::UnknownProfile { name } => {
                let mut available: Vec<String> = nurtura_config::load_config_or_default()
                    .profiles
                    .into_keys()
                    .collect();
                available.sort();
                CliError::ProfileNotFound {
                    name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                }
            }
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── Core error types ──
//
// Errors from building and driving a dashboard context. Query and mutation
// failures never surface here: hooks hand out `NormalizedError` instead.
// The `From<nurtura_api::Error>` impl covers setup paths (client
// construction, realtime connect) that still talk to the API crate.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("No active session")]
    NoSession,

    #[error("Unauthorized: the session has been signed out")]
    Unauthorized,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nurtura_api::Error> for CoreError {
    fn from(err: nurtura_api::Error) -> Self {
        match err {
            nurtura_api::Error::Unauthorized => CoreError::Unauthorized,
            nurtura_api::Error::NoSession => CoreError::NoSession,
            nurtura_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            nurtura_api::Error::Transport(ref e) if e.is_timeout() => {
                CoreError::Timeout { timeout_secs: 0 }
            }
            nurtura_api::Error::Transport(e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            nurtura_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            nurtura_api::Error::ClientBuild(message) => CoreError::Config { message },
            nurtura_api::Error::RealtimeConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            nurtura_api::Error::RealtimeClosed => CoreError::ConnectionFailed {
                url: String::new(),
                reason: "realtime connection closed".into(),
            },
            nurtura_api::Error::Api {
                status, message, ..
            } => CoreError::Api {
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
                status: Some(status),
            },
            nurtura_api::Error::Deserialization { message, .. } => CoreError::Api {
                message,
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_server_message() {
        let err: CoreError = nurtura_api::Error::Api {
            status: 409,
            message: Some("Already invited".into()),
            body: None,
        }
        .into();
        assert_eq!(err.to_string(), "API error: Already invited");
    }

    #[test]
    fn session_errors_map_directly() {
        assert!(matches!(
            CoreError::from(nurtura_api::Error::NoSession),
            CoreError::NoSession
        ));
        assert!(matches!(
            CoreError::from(nurtura_api::Error::Timeout { timeout_secs: 20 }),
            CoreError::Timeout { timeout_secs: 20 }
        ));
    }
}

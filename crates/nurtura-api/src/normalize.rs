// Error normalization at the HTTP boundary.
//
// Every failure leaving the HTTP layer is turned into the same
// `{ success: false, data, message }` shape so callers can branch on
// `success` instead of matching transport errors.

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// Coarse failure class, used by the query cache to decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    /// Connection refused, DNS, reset.
    Network,
    /// Per-request upper bound exceeded.
    Timeout,
    /// 401 or missing session. Terminal for the session.
    Unauthorized,
    /// 4xx other than 401: validation or business rule.
    Rejected { status: u16 },
    /// 5xx.
    Server { status: u16 },
    #[default]
    Unknown,
}

impl ErrorKind {
    /// Queries retry these; mutations never retry anything.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Unauthorized | Self::Rejected { .. })
    }

    fn of(error: &Error) -> Self {
        match error {
            Error::Unauthorized | Error::NoSession => Self::Unauthorized,
            Error::Timeout { .. } => Self::Timeout,
            Error::Transport(e) if e.is_timeout() => Self::Timeout,
            Error::Transport(e) if e.is_connect() || e.is_request() => Self::Network,
            Error::RealtimeConnect(_) | Error::RealtimeClosed => Self::Network,
            Error::Api { status, .. } if *status >= 500 => Self::Server { status: *status },
            Error::Api { status, .. } => Self::Rejected { status: *status },
            Error::Transport(_)
            | Error::InvalidUrl(_)
            | Error::ClientBuild(_)
            | Error::Deserialization { .. } => Self::Unknown,
        }
    }
}

/// Uniform failure shape: `{ "success": false, "data": ..., "message": ... }`.
///
/// Produced once by [`normalize`] and passed around as-is afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    success: bool,
    data: serde_json::Value,
    message: String,
    #[serde(skip)]
    kind: ErrorKind,
}

impl NormalizedError {
    /// Build directly, for failures that never touched the HTTP layer
    /// (e.g. a context without a private client).
    pub fn new(kind: ErrorKind, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
            kind,
        }
    }

    /// Always `false`.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NormalizedError {}

/// Normalize an HTTP-layer error.
///
/// Message precedence: server-provided message, then the HTTP library's own
/// message, then `fallback`. `data` is always `default_data`.
pub fn normalize(error: &Error, fallback: &str, default_data: serde_json::Value) -> NormalizedError {
    let message = error
        .server_message()
        .map(str::to_owned)
        .or_else(|| error.library_message())
        .unwrap_or_else(|| fallback.to_owned());

    NormalizedError::new(ErrorKind::of(error), message, default_data)
}

use thiserror::Error;

/// Top-level error type for the `nurtura-api` crate.
///
/// Covers every failure mode of the HTTP and realtime surfaces. Callers
/// rarely match on this directly: the data layer runs it through
/// [`normalize`](crate::normalize::normalize) at the boundary.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authorization ───────────────────────────────────────────────
    /// The backend answered 401. On the private client this has already
    /// triggered a sign-out by the time the caller sees it.
    #[error("Unauthorized (HTTP 401) -- session has been signed out")]
    Unauthorized,

    /// An operation needs an access token but no session is active.
    #[error("No active session")]
    NoSession,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded its upper time bound.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response from the REST API.
    ///
    /// `message` is the server-provided message field, when the body had one.
    #[error("API error (HTTP {status}): {}", message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
        body: Option<serde_json::Value>,
    },

    // ── Realtime ────────────────────────────────────────────────────
    /// Websocket handshake failed.
    #[error("Realtime connection failed: {0}")]
    RealtimeConnect(String),

    /// The realtime connection has been torn down.
    #[error("Realtime connection closed")]
    RealtimeClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the backend rejected the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NoSession)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::RealtimeConnect(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The message field the server put in its error body.
    ///
    /// Blank messages count as absent.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }

    /// The message produced by the HTTP layer itself.
    ///
    /// Timeouts and authorization failures have none: callers fall back to
    /// their own wording for those.
    pub fn library_message(&self) -> Option<String> {
        match self {
            Self::Transport(e) if e.is_timeout() => None,
            Self::Transport(e) => Some(e.to_string()),
            Self::Api { status, .. } => Some(format!("Request failed with status code {status}")),
            Self::InvalidUrl(e) => Some(e.to_string()),
            Self::ClientBuild(message) | Self::Deserialization { message, .. } => {
                Some(message.clone())
            }
            Self::RealtimeConnect(_) | Self::RealtimeClosed => Some(self.to_string()),
            Self::Unauthorized | Self::NoSession | Self::Timeout { .. } => None,
        }
    }
}

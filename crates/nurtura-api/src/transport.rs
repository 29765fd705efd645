// Shared transport configuration for building reqwest::Client instances.
//
// The public and private API clients share timeout, TLS, and user-agent
// settings through this module, so both instances behave identically on
// the wire apart from the Authorization header.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// Fixed upper bound for a single request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request upper bound.
    pub timeout: Duration,
    /// Extra root certificate (PEM) for staging backends.
    pub ca_cert: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            ca_cert: None,
            user_agent: concat!("nurtura/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Same defaults, different timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` with additional default headers.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers);

        if let Some(ref path) = self.ca_cert {
            let cert_pem = std::fs::read(path)
                .map_err(|e| Error::ClientBuild(format!("failed to read CA cert: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&cert_pem)
                .map_err(|e| Error::ClientBuild(format!("invalid CA cert: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

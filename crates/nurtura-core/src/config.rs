// ── Runtime dashboard configuration ──
//
// Describes how a dashboard context talks to the backend and how its cache
// behaves. Never touches disk: `nurtura-config` (or a test) builds one and
// hands it to `DashboardContext`.

use std::time::Duration;

use nurtura_api::{RealtimeConfig, TransportConfig};
use url::Url;

use crate::cache::QueryOptions;

/// Default garbage-collection window for unobserved stale entries.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);

/// Default redirect target handed to the identity provider on sign-out.
pub const DEFAULT_SIGN_OUT_CALLBACK: &str = "/login";

/// Configuration for one dashboard context.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// REST base URL, e.g. `https://api.nurtura.app/api/v1`.
    pub api_url: Url,
    /// Timeout, TLS, and user-agent for both HTTP clients.
    pub transport: TransportConfig,
    /// Defaults for every cached query.
    pub query: QueryOptions,
    /// How long unobserved stale entries survive `gc()`.
    pub gc_time: Duration,
    pub realtime: RealtimeConfig,
    /// Passed to `SessionProvider::sign_out` on a 401.
    pub sign_out_callback: String,
}

impl DashboardConfig {
    /// Defaults for everything but the base URL.
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            transport: TransportConfig::default(),
            query: QueryOptions::default(),
            gc_time: DEFAULT_GC_TIME,
            realtime: RealtimeConfig::default(),
            sign_out_callback: DEFAULT_SIGN_OUT_CALLBACK.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    pub fn with_query_options(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_behaviour() {
        let config = DashboardConfig::new(Url::parse("https://api.nurtura.app/api").unwrap());
        assert_eq!(config.transport.timeout, Duration::from_secs(20));
        assert_eq!(config.query.stale_time, Duration::from_secs(60));
        assert_eq!(config.query.retry, 1);
        assert_eq!(config.gc_time, Duration::from_secs(300));
        assert_eq!(config.realtime.namespace, "/chat");
        assert_eq!(config.sign_out_callback, "/login");
    }
}

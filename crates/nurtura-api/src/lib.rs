// nurtura-api: Async Rust client for the Nurtura platform REST API and realtime channel

pub mod client;
pub mod error;
pub mod normalize;
pub mod realtime;
pub mod session;
pub mod transport;

pub use client::{ApiClient, ApiEnvelope, RequestConfig};
pub use error::Error;
pub use normalize::{ErrorKind, NormalizedError, normalize};
pub use realtime::{RealtimeConfig, RealtimeConnection, RealtimeMessage, ReconnectConfig};
pub use session::{MemorySessionStore, Role, Session, SessionProvider, SessionStatus, SessionUser};
pub use transport::TransportConfig;

pub use reqwest::Method;

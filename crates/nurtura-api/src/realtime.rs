//! Realtime channel over a namespaced websocket.
//!
//! [`RealtimeConnection::connect`] returns an owned handle: dropping it or
//! calling [`disconnect`](RealtimeConnection::disconnect) tears down the
//! background task. Incoming frames are JSON `{ "event", "data" }` objects
//! fanned out through a [`tokio::sync::broadcast`] channel; outgoing frames
//! go through an `mpsc` queue owned by the same task. Dropped connections
//! are re-established with exponential backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use nurtura_api::realtime::{RealtimeConfig, RealtimeConnection};
//!
//! let conn = RealtimeConnection::connect(&api_base, &token, &RealtimeConfig::default())?;
//! let mut rx = conn.subscribe();
//! while let Ok(msg) = rx.recv().await {
//!     println!("{}: {}", msg.event, msg.data);
//! }
//! conn.disconnect().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const OUTGOING_CHANNEL_CAPACITY: usize = 64;

// ── Messages ─────────────────────────────────────────────────────────

/// One frame on the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    /// Event name, e.g. `"message"`, `"typing"`, `"conversation:read"`.
    pub event: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl RealtimeMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Exponential backoff for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Socket namespace appended to the origin, e.g. `/chat`.
    pub namespace: String,
    pub reconnect: ReconnectConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            namespace: "/chat".into(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Derive the socket URL from the REST base URL.
///
/// Everything from the first path segment named exactly `api` on is
/// stripped, the scheme is mapped to `ws`/`wss`, and `namespace` becomes
/// the path:
/// `https://host/api/v1` + `/chat` → `wss://host/chat`.
pub fn socket_url(api_base: &Url, namespace: &str) -> Result<Url, Error> {
    let mut url = api_base.clone();

    let scheme = match api_base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::RealtimeConnect(format!(
                "unsupported scheme for realtime: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::RealtimeConnect(format!("cannot switch scheme to {scheme}")))?;

    let segments: Vec<&str> = api_base
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let root = segments
        .iter()
        .position(|s| *s == "api")
        .unwrap_or(segments.len());

    let mut path = String::new();
    for segment in segments.iter().take(root) {
        path.push('/');
        path.push_str(segment);
    }
    path.push('/');
    path.push_str(namespace.trim_start_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

// ── RealtimeConnection ───────────────────────────────────────────────

/// Owned handle to a running realtime connection.
pub struct RealtimeConnection {
    url: Url,
    event_rx: broadcast::Receiver<Arc<RealtimeMessage>>,
    outgoing: mpsc::Sender<RealtimeMessage>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RealtimeConnection {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    ///
    /// Returns once the task is spawned; the handshake happens in the
    /// background and is retried with backoff on failure.
    pub fn connect(
        api_base: &Url,
        token: &SecretString,
        config: &RealtimeConfig,
    ) -> Result<Self, Error> {
        let url = socket_url(api_base, &config.namespace)?;
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outgoing, outgoing_rx) = mpsc::channel(OUTGOING_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(ws_loop(
            url.clone(),
            format!("Bearer {}", token.expose_secret()),
            event_tx,
            outgoing_rx,
            config.reconnect.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            url,
            event_rx,
            outgoing,
            cancel,
            task: Some(task),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// New receiver for incoming frames. Slow consumers see `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RealtimeMessage>> {
        self.event_rx.resubscribe()
    }

    /// Incoming frames as a `Stream`, skipping over lag gaps.
    pub fn messages(&self) -> impl Stream<Item = Arc<RealtimeMessage>> + use<> {
        let mut rx = self.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(msg) => yield msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "realtime receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Queue a frame for sending.
    pub async fn send(&self, event: impl Into<String>, data: serde_json::Value) -> Result<(), Error> {
        self.outgoing
            .send(RealtimeMessage::new(event, data))
            .await
            .map_err(|_| Error::RealtimeClosed)
    }

    /// Stop the background task and wait for it to finish.
    pub async fn disconnect(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "realtime task ended abnormally");
            }
        }
        tracing::info!(url = %self.url, "realtime connection closed");
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → pump frames → on error, backoff → reconnect.
async fn ws_loop(
    url: Url,
    authorization: String,
    event_tx: broadcast::Sender<Arc<RealtimeMessage>>,
    mut outgoing: mpsc::Receiver<RealtimeMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_pump(&url, &authorization, &event_tx, &mut outgoing, &cancel) => {
                match result {
                    Ok(()) if cancel.is_cancelled() => break,
                    Ok(()) => {
                        tracing::info!("realtime disconnected cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "realtime error");

                        if reconnect.max_retries.is_some_and(|max| attempt >= max) {
                            tracing::error!(attempt, "realtime reconnection limit reached, giving up");
                            break;
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(delay_ms = delay.as_millis(), attempt, "waiting before reconnect");

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!("realtime loop exiting");
}

/// One connection lifetime: handshake, then read and write until it drops.
async fn connect_and_pump(
    url: &Url,
    authorization: &str,
    event_tx: &broadcast::Sender<Arc<RealtimeMessage>>,
    outgoing: &mut mpsc::Receiver<RealtimeMessage>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting realtime channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::RealtimeConnect(e.to_string()))?;

    let request = ClientRequestBuilder::new(uri).with_header("Authorization", authorization);

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::RealtimeConnect(e.to_string()))?;

    tracing::info!("realtime channel connected");

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            Some(msg) = outgoing.recv() => {
                match serde_json::to_string(&msg) {
                    Ok(text) => write
                        .send(tungstenite::Message::Text(text.into()))
                        .await
                        .map_err(|e| Error::RealtimeConnect(e.to_string()))?,
                    Err(e) => tracing::warn!(error = %e, event = %msg.event, "dropping unserializable frame"),
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(text.as_str(), event_tx);
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "realtime close frame received");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(Error::RealtimeConnect(e.to_string())),
                    None => {
                        tracing::info!("realtime stream ended");
                        return Ok(());
                    }
                    // Ping/pong handled by tungstenite; binary frames unused.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<Arc<RealtimeMessage>>) {
    match serde_json::from_str::<RealtimeMessage>(text) {
        Ok(msg) => {
            // No subscribers right now is fine.
            let _ = event_tx.send(Arc::new(msg));
        }
        Err(e) => tracing::debug!(error = %e, "ignoring malformed realtime frame"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// `delay = min(initial * 2^attempt, max) * jitter`, jitter within ±25%.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_strips_api_suffix() {
        let base = Url::parse("https://api.nurtura.app/api/v1/").unwrap();
        assert_eq!(
            socket_url(&base, "/chat").unwrap().as_str(),
            "wss://api.nurtura.app/chat"
        );
    }

    #[test]
    fn socket_url_keeps_mount_prefix_and_plain_http() {
        let base = Url::parse("http://localhost:4000/backend/api").unwrap();
        assert_eq!(
            socket_url(&base, "chat").unwrap().as_str(),
            "ws://localhost:4000/backend/chat"
        );
    }

    #[test]
    fn socket_url_matches_whole_api_segment_only() {
        let base = Url::parse("https://host.example/apiary/v1").unwrap();
        assert_eq!(
            socket_url(&base, "/chat").unwrap().as_str(),
            "wss://host.example/apiary/v1/chat"
        );

        let base = Url::parse("https://host.example/v2/apis/api/v1").unwrap();
        assert_eq!(
            socket_url(&base, "/chat").unwrap().as_str(),
            "wss://host.example/v2/apis/chat"
        );
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        let base = Url::parse("ftp://example.com/api").unwrap();
        assert!(matches!(
            socket_url(&base, "/chat"),
            Err(Error::RealtimeConnect(_))
        ));
    }

    #[test]
    fn backoff_increases_then_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };
        let d0 = calculate_backoff(0, &config);
        let d2 = calculate_backoff(2, &config);
        assert!(d2 > d0, "d2 ({d2:?}) should exceed d0 ({d0:?})");
        assert!(calculate_backoff(40, &config) <= Duration::from_millis(12_500));
    }

    #[test]
    fn frames_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(8);
        parse_and_broadcast(
            r#"{"event":"message","data":{"conversationId":"c1","body":"hi"}}"#,
            &tx,
        );
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.event, "message");
        assert_eq!(msg.data["body"], "hi");
    }

    #[test]
    fn malformed_frames_are_skipped() {
        let (tx, mut rx) = broadcast::channel::<Arc<RealtimeMessage>>(8);
        parse_and_broadcast("not json", &tx);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_stops_the_task() {
        // Nothing listens on this port; the loop sits in backoff until cancelled.
        let base = Url::parse("http://127.0.0.1:9/api").unwrap();
        let token = SecretString::from("t".to_owned());
        let conn = RealtimeConnection::connect(&base, &token, &RealtimeConfig::default()).unwrap();
        assert_eq!(conn.url().as_str(), "ws://127.0.0.1:9/chat");
        tokio::time::timeout(Duration::from_secs(5), conn.disconnect())
            .await
            .unwrap();
    }
}

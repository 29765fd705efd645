// REST client for the Nurtura backend.
//
// Two flavours share one type: a public instance that never sends
// credentials, and a private instance that reads the bearer token from the
// session provider before every request and signs the user out on any 401.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::session::SessionProvider;
use crate::transport::TransportConfig;

// ── Envelopes ────────────────────────────────────────────────────────

/// Standard success envelope: `{ "data": ..., "message": ..., "status": ... }`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
    /// Some endpoints send a boolean, others an HTTP-ish code.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// Error body shape. NestJS-style validation errors send `message` as an array.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<MessageField>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageField {
    One(String),
    Many(Vec<String>),
}

impl MessageField {
    fn into_message(self) -> String {
        match self {
            Self::One(message) => message,
            Self::Many(messages) => messages.join(", "),
        }
    }
}

// ── Request configuration ────────────────────────────────────────────

/// Per-call knobs: query string, timeout override, extra headers.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn with_query(query: Vec<(String, String)>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Clone)]
enum ClientAuth {
    Public,
    Private {
        session: Arc<dyn SessionProvider>,
        sign_out_callback: String,
    },
}

/// Async client for the Nurtura REST API.
///
/// Cheap to clone: the underlying `reqwest::Client` and the session
/// provider are reference-counted.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    auth: ClientAuth,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Unauthenticated instance (invite completion and other open endpoints).
    pub fn public(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, transport.timeout)
    }

    /// Bearer-authenticated instance bound to `session`.
    ///
    /// Any 401 answer calls `session.sign_out(sign_out_callback)`.
    pub fn private(
        base_url: &str,
        transport: &TransportConfig,
        session: Arc<dyn SessionProvider>,
        sign_out_callback: impl Into<String>,
    ) -> Result<Self, Error> {
        Ok(Self::public(base_url, transport)?.with_session(session, sign_out_callback))
    }

    /// Wrap an existing `reqwest::Client` as a public instance.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            timeout,
            auth: ClientAuth::Public,
        })
    }

    /// Turn this instance into a private one.
    pub fn with_session(
        mut self,
        session: Arc<dyn SessionProvider>,
        sign_out_callback: impl Into<String>,
    ) -> Self {
        self.auth = ClientAuth::Private {
            session,
            sign_out_callback: sign_out_callback.into(),
        };
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_private(&self) -> bool {
        matches!(self.auth, ClientAuth::Private { .. })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an endpoint path (`"/admin/team"` or `"admin/team"`) onto the base.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Core request ─────────────────────────────────────────────────

    /// Send a request and decode the JSON response into `T`.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<_>`
    /// work for 204 endpoints.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        config: &RequestConfig,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path)?;
        let timeout = config.timeout.unwrap_or(self.timeout);

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if !config.query.is_empty() {
            builder = builder.query(&config.query);
        }
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = self.authorize(builder);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, %url, query = ?config.query, "sending request");

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        })?;

        self.handle_response(resp).await
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, ()>(Method::GET, path, None, &RequestConfig::default())
            .await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, Error> {
        self.request::<T, ()>(Method::GET, path, None, &RequestConfig::with_query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.request(Method::POST, path, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.request(Method::PUT, path, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.request(Method::PATCH, path, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, ()>(Method::DELETE, path, None, &RequestConfig::default())
            .await
    }

    // ── Auth ─────────────────────────────────────────────────────────

    /// Attach the bearer token of the current session, if there is one.
    /// Without a session the request goes out bare and the server decides.
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            ClientAuth::Public => builder,
            ClientAuth::Private { session, .. } => match session.current_session() {
                Some(current) => builder.bearer_auth(current.access_token.expose_secret()),
                None => builder,
            },
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "response received");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            if let ClientAuth::Private {
                session,
                sign_out_callback,
            } = &self.auth
            {
                warn!(url = %resp.url(), "backend rejected the session");
                session.sign_out(sign_out_callback);
            }
            return Err(Error::Unauthorized);
        }

        let body = resp.text().await?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        let payload = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(payload).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Ensure the base URL ends with a slash so relative joins keep its path.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

fn parse_error(status: reqwest::StatusCode, raw: &str) -> Error {
    let json: Option<serde_json::Value> = serde_json::from_str(raw).ok();
    let message = serde_json::from_str::<ErrorBody>(raw)
        .ok()
        .and_then(|body| body.message.map(MessageField::into_message).or(body.error));

    Error::Api {
        status: status.as_u16(),
        message,
        body: json,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://api.nurtura.app/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.nurtura.app/api/v1/");
        let joined = url.join("admin/team").unwrap();
        assert_eq!(joined.as_str(), "https://api.nurtura.app/api/v1/admin/team");
    }

    #[test]
    fn parse_error_prefers_message_then_error_field() {
        let err = parse_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"message":"Email already invited","error":"Bad Request"}"#,
        );
        assert_eq!(err.server_message(), Some("Email already invited"));

        let err = parse_error(reqwest::StatusCode::CONFLICT, r#"{"error":"Conflict"}"#);
        assert_eq!(err.server_message(), Some("Conflict"));
    }

    #[test]
    fn parse_error_joins_validation_arrays() {
        let err = parse_error(
            reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":["email must be an email","role should not be empty"]}"#,
        );
        assert_eq!(
            err.server_message(),
            Some("email must be an email, role should not be empty")
        );
    }

    #[test]
    fn parse_error_without_json_body() {
        let err = parse_error(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.server_message().is_none());
        assert_eq!(err.status(), Some(502));
    }
}

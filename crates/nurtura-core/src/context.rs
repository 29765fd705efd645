// ── Dashboard context ──
//
// One context per signed-in session. It owns the public and private API
// clients, the query cache and the notifier, and vends the domain hooks.
// Nothing here is global: a front end builds a context at sign-in and
// drops (or `end_session`s) it at sign-out.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use nurtura_api::{
    ApiClient, ErrorKind, Method, NormalizedError, RealtimeConnection, RequestConfig, Role,
    SessionProvider, SessionUser, normalize,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{QueryCache, QueryKey, QueryObserver};
use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::hooks::{
    AnalyticsHooks, InvoiceHooks, ReviewHooks, SubscriptionHooks, TeamHooks, UserHooks,
};
use crate::model::Ack;
use crate::mutation::Mutation;
use crate::notify::Notifier;

/// Explicitly constructed session scope. Cheap to clone.
#[derive(Clone)]
pub struct DashboardContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: DashboardConfig,
    public: ApiClient,
    private: ApiClient,
    session: Arc<dyn SessionProvider>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
}

impl DashboardContext {
    // ── Construction ─────────────────────────────────────────────────

    /// Build a context bound to `session`, with a fresh cache.
    pub fn new(
        config: DashboardConfig,
        session: Arc<dyn SessionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, CoreError> {
        let public = ApiClient::public(config.api_url.as_str(), &config.transport)?;
        let private = public
            .clone()
            .with_session(Arc::clone(&session), config.sign_out_callback.clone());
        let cache = QueryCache::new(config.query, config.gc_time);

        info!(api_url = %config.api_url, "dashboard context created");

        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                public,
                private,
                session,
                cache,
                notifier,
            }),
        })
    }

    /// Request-scoped copy: same clients and session, empty cache.
    pub fn for_request(&self) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(ContextInner {
                config: inner.config.clone(),
                public: inner.public.clone(),
                private: inner.private.clone(),
                session: Arc::clone(&inner.session),
                cache: QueryCache::new(inner.config.query, inner.config.gc_time),
                notifier: Arc::clone(&inner.notifier),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    pub fn public_client(&self) -> &ApiClient {
        &self.inner.public
    }

    pub fn private_client(&self) -> &ApiClient {
        &self.inner.private
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.inner
            .session
            .current_session()
            .map(|session| session.user.clone())
    }

    pub fn role(&self) -> Option<Role> {
        self.current_user().map(|user| user.role)
    }

    /// Refuse `action` when the signed-in role is not `permitted`.
    ///
    /// Without a session the call is allowed through; the server answers
    /// 401 and the private client signs out.
    pub fn authorize(&self, permitted: fn(Role) -> bool, action: &str) -> Result<(), NormalizedError> {
        match self.role() {
            Some(role) if !permitted(role) => {
                debug!(%role, action, "refused by role");
                Err(NormalizedError::new(
                    ErrorKind::Rejected { status: 403 },
                    format!("The {role} role cannot {action}"),
                    Value::Null,
                ))
            }
            _ => Ok(()),
        }
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Drop every cached entry. Call when the session ends.
    pub fn end_session(&self) {
        self.inner.cache.clear();
        info!("dashboard session ended");
    }

    /// Sign out through the identity provider, then end the session.
    pub fn sign_out(&self) {
        self.inner.session.sign_out(&self.inner.config.sign_out_callback);
        self.end_session();
    }

    /// Open the realtime channel with the current access token.
    pub fn connect_realtime(&self) -> Result<RealtimeConnection, CoreError> {
        let session = self
            .inner
            .session
            .current_session()
            .ok_or(CoreError::NoSession)?;
        Ok(RealtimeConnection::connect(
            &self.inner.config.api_url,
            &session.access_token,
            &self.inner.config.realtime,
        )?)
    }

    // ── Hooks ────────────────────────────────────────────────────────

    pub fn analytics(&self) -> AnalyticsHooks {
        AnalyticsHooks::new(self.clone())
    }

    pub fn reviews(&self) -> ReviewHooks {
        ReviewHooks::new(self.clone())
    }

    pub fn team(&self) -> TeamHooks {
        TeamHooks::new(self.clone())
    }

    pub fn invoices(&self) -> InvoiceHooks {
        InvoiceHooks::new(self.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionHooks {
        SubscriptionHooks::new(self.clone())
    }

    pub fn users(&self) -> UserHooks {
        UserHooks::new(self.clone())
    }

    // ── Hook plumbing ────────────────────────────────────────────────

    /// Cached `GET` through the private client, with the cache defaults.
    pub(crate) async fn cached<T>(
        &self,
        key: QueryKey,
        path: String,
        query: Vec<(String, String)>,
        fallback: &'static str,
    ) -> Result<Arc<T>, NormalizedError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let fetcher = self.fetcher::<T>(path, query, fallback);
        self.inner
            .cache
            .query(key, self.inner.cache.defaults(), fetcher)
            .await
    }

    /// Observer for a cached `GET` through the private client.
    pub(crate) fn observe<T>(
        &self,
        key: QueryKey,
        path: String,
        query: Vec<(String, String)>,
        fallback: &'static str,
    ) -> QueryObserver<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let fetcher = self.fetcher::<T>(path, query, fallback);
        self.inner
            .cache
            .subscribe(key, self.inner.cache.defaults(), fetcher)
    }

    /// Mutation wired to this context's cache and notifier.
    pub(crate) fn mutation<I, F, Fut>(&self, name: &'static str, run: F) -> Mutation<I, Ack>
    where
        I: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Ack, NormalizedError>> + Send + 'static,
    {
        Mutation::new(
            name,
            self.inner.cache.clone(),
            Arc::clone(&self.inner.notifier),
            run,
        )
    }

    /// Mutation that checks the session's role on every run before any
    /// request goes out.
    pub(crate) fn guarded_mutation<I, F, Fut>(
        &self,
        name: &'static str,
        permitted: fn(Role) -> bool,
        action: &'static str,
        run: F,
    ) -> Mutation<I, Ack>
    where
        I: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Ack, NormalizedError>> + Send + 'static,
    {
        let ctx = self.clone();
        self.mutation(name, move |input: I| {
            let request = ctx.authorize(permitted, action).map(|()| run(input));
            async move { request?.await }
        })
    }

    fn fetcher<T>(
        &self,
        path: String,
        query: Vec<(String, String)>,
        fallback: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, Result<T, NormalizedError>> + Send + Sync + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.inner.private.clone();
        move || {
            let client = client.clone();
            let path = path.clone();
            let config = RequestConfig::with_query(query.clone());
            async move {
                let body: Value = client
                    .request::<Value, ()>(Method::GET, &path, None, &config)
                    .await
                    .map_err(|e| normalize(&e, fallback, Value::Null))?;
                decode_payload(body).map_err(|e| normalize(&e, fallback, Value::Null))
            }
            .boxed()
        }
    }
}

// ── Request helpers shared by the hooks ──────────────────────────────

/// Send a mutation request and acknowledge the response.
pub(crate) async fn send<B>(
    client: &ApiClient,
    method: Method,
    path: &str,
    body: Option<&B>,
    fallback: &str,
) -> Result<Ack, NormalizedError>
where
    B: Serialize + ?Sized + Sync,
{
    debug!(%method, path, "mutation request");
    client
        .request::<Value, B>(method, path, body, &RequestConfig::default())
        .await
        .map(Ack::from_body)
        .map_err(|e| normalize(&e, fallback, Value::Null))
}

/// Decode a query response: the `data` field of an envelope when it has the
/// right shape, otherwise the whole body.
fn decode_payload<T: DeserializeOwned>(body: Value) -> Result<T, nurtura_api::Error> {
    if let Some(data) = body.get("data") {
        if let Ok(decoded) = T::deserialize(data) {
            return Ok(decoded);
        }
    }
    let raw = body.to_string();
    serde_json::from_value(body).map_err(|e| nurtura_api::Error::Deserialization {
        message: e.to_string(),
        body: raw,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::Page;

    #[test]
    fn payload_prefers_data_field() {
        let page: Page<u32> =
            decode_payload(json!({ "data": { "items": [1, 2], "meta": { "total": 2 } } })).unwrap();
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn payload_falls_back_to_whole_body() {
        let page: Page<u32> = decode_payload(json!({ "data": [1, 2, 3], "total": 9 })).unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.total(), 9);
    }

    #[test]
    fn undecodable_payload_is_deserialization_error() {
        let err = decode_payload::<Vec<u32>>(json!({ "data": "nope" })).unwrap_err();
        assert!(matches!(err, nurtura_api::Error::Deserialization { .. }));
    }
}

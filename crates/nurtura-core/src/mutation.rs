// ── Mutations ──
//
// A mutation wraps one state-changing request with a small state machine
// (idle → pending → success | error) and its side effects: on success it
// invalidates the related query prefixes and posts a success notification,
// on failure it posts the normalized error message. Mutations never retry.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use nurtura_api::NormalizedError;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::notify::{Notification, Notifier};

type Run<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, NormalizedError>> + Send + Sync>;

/// Where a mutation is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error(NormalizedError),
}

/// A bound, reusable state-changing operation.
pub struct Mutation<I, O> {
    name: &'static str,
    run: Run<I, O>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    invalidates: Vec<QueryKey>,
    success_message: Option<Cow<'static, str>>,
    status: watch::Sender<MutationStatus>,
}

impl<I: Send + 'static, O: Send + 'static> Mutation<I, O> {
    pub fn new<F, Fut>(
        name: &'static str,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
        run: F,
    ) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, NormalizedError>> + Send + 'static,
    {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            name,
            run: Arc::new(move |input| run(input).boxed()),
            cache,
            notifier,
            invalidates: Vec::new(),
            success_message: None,
            status,
        }
    }

    /// Invalidate `prefix` after every successful run.
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Post `message` as a success notification after every successful run.
    pub fn success_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the mutation once.
    ///
    /// A 401 produces no notification: the session is already gone and the
    /// user is on their way to the sign-in page.
    pub async fn mutate(&self, input: I) -> Result<O, NormalizedError> {
        self.status.send_replace(MutationStatus::Pending);
        debug!(mutation = self.name, "mutation started");

        match (self.run)(input).await {
            Ok(output) => {
                for prefix in &self.invalidates {
                    self.cache.invalidate(prefix);
                }
                if let Some(message) = &self.success_message {
                    self.notifier.notify(Notification::success(message.as_ref()));
                }
                self.status.send_replace(MutationStatus::Success);
                debug!(mutation = self.name, "mutation succeeded");
                Ok(output)
            }
            Err(err) => {
                warn!(mutation = self.name, error = %err, "mutation failed");
                if !err.is_unauthorized() {
                    self.notifier.notify(Notification::error(err.message()));
                }
                self.status.send_replace(MutationStatus::Error(err.clone()));
                Err(err)
            }
        }
    }

    pub fn status(&self) -> MutationStatus {
        self.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.status.borrow(), MutationStatus::Pending)
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    /// Back to idle without running.
    pub fn reset(&self) {
        self.status.send_replace(MutationStatus::Idle);
    }
}

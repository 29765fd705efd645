// ── User subscription hooks ──
//
// Plans live in their own namespace: cancelling a subscription does not
// change the plan catalogue.

use std::sync::Arc;

use nurtura_api::{Method, NormalizedError, Role};

use crate::cache::{QueryKey, QueryObserver};
use crate::context::{DashboardContext, send};
use crate::hooks::analytics;
use crate::model::{Ack, CancelSubscription, ListParams, Page, SubscriptionPlan, UserSubscription};
use crate::mutation::Mutation;

pub const NAMESPACE: &str = "user-subscriptions";
pub const PLANS_NAMESPACE: &str = "subscription-plans";

pub mod keys {
    use super::{ListParams, NAMESPACE, PLANS_NAMESPACE, QueryKey};

    pub fn all() -> QueryKey {
        QueryKey::new(NAMESPACE)
    }

    pub fn list(params: &ListParams) -> QueryKey {
        all().with("list").with_params(params)
    }

    pub fn plans() -> QueryKey {
        QueryKey::new(PLANS_NAMESPACE)
    }
}

pub struct SubscriptionHooks {
    ctx: DashboardContext,
}

impl SubscriptionHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<Arc<Page<UserSubscription>>, NormalizedError> {
        self.ctx
            .cached(
                keys::list(params),
                "/subscriptions".into(),
                params.to_query(),
                "Failed to load subscriptions",
            )
            .await
    }

    pub fn watch_list(&self, params: &ListParams) -> QueryObserver<Page<UserSubscription>> {
        self.ctx.observe(
            keys::list(params),
            "/subscriptions".into(),
            params.to_query(),
            "Failed to load subscriptions",
        )
    }

    pub async fn plans(&self) -> Result<Arc<Vec<SubscriptionPlan>>, NormalizedError> {
        self.ctx
            .cached(
                keys::plans(),
                "/subscriptions/plans".into(),
                Vec::new(),
                "Failed to load subscription plans",
            )
            .await
    }

    /// `POST /subscriptions/{id}/cancel`
    pub fn cancel(&self) -> Mutation<CancelSubscription, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "cancel_subscription",
                Role::can_view_finance,
                "cancel subscriptions",
                move |input: CancelSubscription| {
                    let client = client.clone();
                    async move {
                        let path = format!("/subscriptions/{}/cancel", input.id);
                        send(&client, Method::POST, &path, Some(&input), "Failed to cancel subscription")
                            .await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("Subscription cancelled")
    }
}

// ── Review moderation hooks ──

use std::sync::Arc;

use nurtura_api::{Method, NormalizedError, Role};

use crate::cache::{QueryKey, QueryObserver};
use crate::context::{DashboardContext, send};
use crate::hooks::analytics;
use crate::model::{Ack, ListParams, Page, Review, UpdateReviewStatus};
use crate::mutation::Mutation;

pub const NAMESPACE: &str = "admin-reviews";

pub mod keys {
    use super::{ListParams, NAMESPACE, QueryKey};

    pub fn all() -> QueryKey {
        QueryKey::new(NAMESPACE)
    }

    pub fn list(params: &ListParams) -> QueryKey {
        all().with("list").with_params(params)
    }
}

pub struct ReviewHooks {
    ctx: DashboardContext,
}

impl ReviewHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Arc<Page<Review>>, NormalizedError> {
        self.ctx
            .cached(
                keys::list(params),
                "/admin/reviews".into(),
                params.to_query(),
                "Failed to load reviews",
            )
            .await
    }

    pub fn watch_list(&self, params: &ListParams) -> QueryObserver<Page<Review>> {
        self.ctx.observe(
            keys::list(params),
            "/admin/reviews".into(),
            params.to_query(),
            "Failed to load reviews",
        )
    }

    /// `PATCH /admin/reviews/{id}/status`
    pub fn update_status(&self) -> Mutation<UpdateReviewStatus, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "update_review_status",
                Role::can_moderate_reviews,
                "moderate reviews",
                move |input: UpdateReviewStatus| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/reviews/{}/status", input.id);
                        send(&client, Method::PATCH, &path, Some(&input), "Failed to update review").await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("Review updated")
    }

    /// `DELETE /admin/reviews/{id}`
    pub fn delete(&self) -> Mutation<String, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "delete_review",
                Role::can_moderate_reviews,
                "moderate reviews",
                move |id: String| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/reviews/{id}");
                        send::<()>(&client, Method::DELETE, &path, None, "Failed to delete review").await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("Review deleted")
    }
}

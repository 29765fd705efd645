// ── Platform user hooks ──

use std::sync::Arc;

use nurtura_api::{Method, NormalizedError, Role};

use crate::cache::{QueryKey, QueryObserver};
use crate::context::{DashboardContext, send};
use crate::hooks::analytics;
use crate::model::{Ack, AdminUser, ListParams, Page, UpdateUserStatus};
use crate::mutation::Mutation;

pub const NAMESPACE: &str = "admin-users";

pub mod keys {
    use super::{ListParams, NAMESPACE, QueryKey};

    pub fn all() -> QueryKey {
        QueryKey::new(NAMESPACE)
    }

    pub fn list(params: &ListParams) -> QueryKey {
        all().with("list").with_params(params)
    }

    pub fn detail(id: &str) -> QueryKey {
        all().with("detail").with(id)
    }
}

pub struct UserHooks {
    ctx: DashboardContext,
}

impl UserHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Arc<Page<AdminUser>>, NormalizedError> {
        self.ctx
            .cached(
                keys::list(params),
                "/admin/users".into(),
                params.to_query(),
                "Failed to load users",
            )
            .await
    }

    pub fn watch_list(&self, params: &ListParams) -> QueryObserver<Page<AdminUser>> {
        self.ctx.observe(
            keys::list(params),
            "/admin/users".into(),
            params.to_query(),
            "Failed to load users",
        )
    }

    pub async fn detail(&self, id: &str) -> Result<Arc<AdminUser>, NormalizedError> {
        self.ctx
            .cached(
                keys::detail(id),
                format!("/admin/users/{id}"),
                Vec::new(),
                "Failed to load user",
            )
            .await
    }

    /// `PATCH /admin/users/{id}/status`
    pub fn update_status(&self) -> Mutation<UpdateUserStatus, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "update_user_status",
                Role::is_staff,
                "change user status",
                move |input: UpdateUserStatus| {
                    let client = client.clone();
                    async move {
                        let path = format!("/admin/users/{}/status", input.id);
                        send(&client, Method::PATCH, &path, Some(&input), "Failed to update user").await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("User updated")
    }
}

// ── Invoice hooks ──

use std::sync::Arc;

use nurtura_api::{Method, NormalizedError, Role};

use crate::cache::{QueryKey, QueryObserver};
use crate::context::{DashboardContext, send};
use crate::hooks::analytics;
use crate::model::{Ack, Invoice, ListParams, Page};
use crate::mutation::Mutation;

pub const NAMESPACE: &str = "invoices";

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

pub struct InvoiceHooks {
    ctx: DashboardContext,
}

impl InvoiceHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Arc<Page<Invoice>>, NormalizedError> {
        self.ctx
            .cached(
                keys::list(params),
                "/invoices".into(),
                params.to_query(),
                "Failed to load invoices",
            )
            .await
    }

    pub fn watch_list(&self, params: &ListParams) -> QueryObserver<Page<Invoice>> {
        self.ctx.observe(
            keys::list(params),
            "/invoices".into(),
            params.to_query(),
            "Failed to load invoices",
        )
    }

    pub async fn detail(&self, id: &str) -> Result<Arc<Invoice>, NormalizedError> {
        self.ctx
            .cached(
                keys::detail(id),
                format!("/invoices/{id}"),
                Vec::new(),
                "Failed to load invoice",
            )
            .await
    }

    /// `POST /invoices/{id}/send`
    pub fn send(&self) -> Mutation<String, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "send_invoice",
                Role::can_view_finance,
                "manage invoices",
                move |id: String| {
                    let client = client.clone();
                    async move {
                        let path = format!("/invoices/{id}/send");
                        send::<()>(&client, Method::POST, &path, None, "Failed to send invoice").await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("Invoice sent")
    }

    /// `PATCH /invoices/{id}/void`
    pub fn void(&self) -> Mutation<String, Ack> {
        let client = self.ctx.private_client().clone();
        self.ctx
            .guarded_mutation(
                "void_invoice",
                Role::can_view_finance,
                "manage invoices",
                move |id: String| {
                    let client = client.clone();
                    async move {
                        let path = format!("/invoices/{id}/void");
                        send::<()>(&client, Method::PATCH, &path, None, "Failed to void invoice").await
                    }
                },
            )
            .invalidates(keys::all())
            .invalidates(analytics::keys::all())
            .success_message("Invoice voided")
    }
}

// ── Analytics hooks ──
//
// Read-only. Every mutation that moves a headline number invalidates the
// whole `analytics` namespace.

use std::sync::Arc;

use nurtura_api::NormalizedError;

use crate::cache::{QueryKey, QueryObserver};
use crate::context::DashboardContext;
use crate::model::{AnalyticsOverview, BookingStats, ListParams, RevenuePoint, UserGrowthPoint};

pub const NAMESPACE: &str = "analytics";

pub mod keys {
    use super::{ListParams, NAMESPACE, QueryKey};

    pub fn all() -> QueryKey {
        QueryKey::new(NAMESPACE)
    }

    pub fn overview(params: &ListParams) -> QueryKey {
        all().with("overview").with_params(params)
    }

    pub fn revenue(params: &ListParams) -> QueryKey {
        all().with("revenue").with_params(params)
    }

    pub fn user_growth(params: &ListParams) -> QueryKey {
        all().with("user-growth").with_params(params)
    }

    pub fn bookings(params: &ListParams) -> QueryKey {
        all().with("bookings").with_params(params)
    }
}

pub struct AnalyticsHooks {
    ctx: DashboardContext,
}

impl AnalyticsHooks {
    pub(crate) fn new(ctx: DashboardContext) -> Self {
        Self { ctx }
    }

    pub async fn overview(
        &self,
        params: &ListParams,
    ) -> Result<Arc<AnalyticsOverview>, NormalizedError> {
        self.ctx
            .cached(
                keys::overview(params),
                "/analytics/overview".into(),
                params.to_query(),
                "Failed to load analytics overview",
            )
            .await
    }

    pub fn watch_overview(&self, params: &ListParams) -> QueryObserver<AnalyticsOverview> {
        self.ctx.observe(
            keys::overview(params),
            "/analytics/overview".into(),
            params.to_query(),
            "Failed to load analytics overview",
        )
    }

    pub async fn revenue(
        &self,
        params: &ListParams,
    ) -> Result<Arc<Vec<RevenuePoint>>, NormalizedError> {
        self.ctx
            .cached(
                keys::revenue(params),
                "/analytics/revenue".into(),
                params.to_query(),
                "Failed to load revenue",
            )
            .await
    }

    pub async fn user_growth(
        &self,
        params: &ListParams,
    ) -> Result<Arc<Vec<UserGrowthPoint>>, NormalizedError> {
        self.ctx
            .cached(
                keys::user_growth(params),
                "/analytics/user-growth".into(),
                params.to_query(),
                "Failed to load user growth",
            )
            .await
    }

    pub async fn bookings(
        &self,
        params: &ListParams,
    ) -> Result<Arc<Vec<BookingStats>>, NormalizedError> {
        self.ctx
            .cached(
                keys::bookings(params),
                "/analytics/bookings".into(),
                params.to_query(),
                "Failed to load bookings",
            )
            .await
    }
}

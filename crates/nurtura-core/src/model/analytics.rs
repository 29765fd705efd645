// ── Analytics payloads ──

use serde::{Deserialize, Serialize};

/// Headline numbers for the dashboard landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsOverview {
    pub total_users: u64,
    pub total_providers: u64,
    pub total_parents: u64,
    pub active_subscriptions: u64,
    pub total_bookings: u64,
    pub total_revenue: f64,
    pub pending_reviews: u64,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Revenue for one period bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    #[serde(alias = "date", alias = "month")]
    pub period: String,
    #[serde(alias = "revenue")]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Sign-ups for one period bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowthPoint {
    #[serde(alias = "date", alias = "month")]
    pub period: String,
    #[serde(default, alias = "users")]
    pub new_users: u64,
    #[serde(default)]
    pub total_users: Option<u64>,
}

/// Booking counts for one period bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStats {
    #[serde(alias = "date", alias = "month")]
    pub period: String,
    #[serde(default, alias = "bookings")]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub cancelled: u64,
}

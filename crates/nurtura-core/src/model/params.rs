// ── List filter parameters ──

use chrono::NaiveDate;
use nurtura_api::Role;
use serde::{Deserialize, Serialize};

/// Filter parameters shared by list endpoints.
///
/// Serialized twice: as the last segment of the query key, and as the query
/// string of the request. `None` fields are omitted from both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    /// Aggregation bucket for analytics, e.g. `day`, `week`, `month`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

impl ListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Query-string pairs in declaration order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                query.push((name.to_owned(), value));
            }
        };
        push("page", self.page.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("search", self.search.clone());
        push("status", self.status.clone());
        push("role", self.role.map(|r| r.to_string()));
        push("from", self.from.map(|d| d.to_string()));
        push("to", self.to.map(|d| d.to_string()));
        push("period", self.period.clone());
        query
    }
}

// ── Paginated list envelope ──

use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
///
/// Accepts `items`, `data` or `results` for the rows, and pagination either
/// nested under `meta` or flat next to the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(alias = "data", alias = "results", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, alias = "pagination")]
    pub meta: Option<PageMeta>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// Total row count across pages, falling back to this page's length.
    pub fn total(&self) -> u64 {
        self.meta
            .map(|m| m.total)
            .or(self.total)
            .unwrap_or_else(|| u64::try_from(self.items.len()).unwrap_or(u64::MAX))
    }

    pub fn page(&self) -> u32 {
        self.meta.map(|m| m.page).or(self.page).unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            meta: None,
            total: None,
            page: None,
            limit: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_meta() {
        let page: Page<u32> = serde_json::from_value(json!({
            "items": [1, 2],
            "meta": { "total": 12, "page": 2, "limit": 2, "totalPages": 6 }
        }))
        .unwrap();
        assert_eq!(page.total(), 12);
        assert_eq!(page.page(), 2);
    }

    #[test]
    fn flat_pagination_and_data_alias() {
        let page: Page<u32> =
            serde_json::from_value(json!({ "data": [1, 2, 3], "total": 30, "page": 1 })).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page.total(), 30);
    }

    #[test]
    fn missing_pagination_falls_back_to_length() {
        let page: Page<u32> = serde_json::from_value(json!({ "items": [1] })).unwrap();
        assert_eq!(page.total(), 1);
        assert_eq!(page.page(), 1);
    }
}

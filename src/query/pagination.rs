use crate::query::QueryParams;
use serde::Serialize;

pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 1000;
/// Largest accepted page; keeps `skip()` within a signed 64-bit OFFSET for any limit.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// Requested page window; 1-based page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// `page` and `limit` from the query string; missing, zero or malformed values use defaults.
    pub fn from_params(params: &QueryParams) -> Self {
        let positive = |key: &str| {
            params
                .get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };
        PageRequest {
            page: positive("page").unwrap_or(1).min(MAX_PAGE),
            limit: positive("limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit).min(i64::MAX as u64)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub limit: u64,
    pub number_of_pages: u64,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u64>,
}

impl Pagination {
    pub fn compute(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        Pagination {
            current_page: page,
            limit,
            number_of_pages: total.div_ceil(limit),
            total,
            next: (page.saturating_mul(limit) < total).then(|| page.saturating_add(1)),
            prev: (page > 1).then(|| page - 1),
        }
    }
}

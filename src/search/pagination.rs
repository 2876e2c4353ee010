// src/search/pagination.rs
//! Page / limit handling shared by package listings and search results

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

/// Page sizes offered by the page limit selector
pub const PAGE_LIMIT_OPTIONS: [i64; 4] = [5, 10, 20, 50];

/// Raw `page` / `limit` query parameters as they arrive from the browser
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// Missing, zero or unparsable values fall back to the defaults
    pub fn resolve(&self) -> (i64, i64) {
        (
            positive_or(self.page.as_deref(), DEFAULT_PAGE),
            positive_or(self.limit.as_deref(), DEFAULT_LIMIT),
        )
    }
}

fn positive_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// 1-based inclusive indices of the results shown on `page`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultWindow {
    pub start_index: i64,
    pub end_index: i64,
}

pub fn result_window(page: i64, limit: i64, total: i64) -> ResultWindow {
    if total <= 0 || limit <= 0 {
        return ResultWindow {
            start_index: 0,
            end_index: 0,
        };
    }

    let page = page.max(1);
    let start_index = ((page - 1) * limit + 1).min(total);
    let end_index = (page * limit).min(total);

    ResultWindow {
        start_index,
        end_index,
    }
}

pub fn previous_page(current: i64) -> i64 {
    (current - 1).max(1)
}

pub fn next_page(current: i64, total_pages: i64) -> i64 {
    (current + 1).min(total_pages).max(1)
}

// src/search/query.rs
//! Search query codec
//!
//! Maps free-text search-box input with inline `type:` / `categories:`
//! directives to a [`StructuredQuery`] and back out to the navigation URL,
//! the package server query string and a human-readable label.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search input is empty")]
    EmptySearchSubmission,
}

/// Parsed search intent with filters separated from the free-text term
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub term: String,
    pub content_type: Option<String>,
    pub category: Option<String>,
}

impl StructuredQuery {
    pub fn has_filters(&self) -> bool {
        self.content_type.is_some() || self.category.is_some()
    }

    /// Nothing to search for: no term and no filter
    pub fn is_empty(&self) -> bool {
        self.term.is_empty() && !self.has_filters()
    }
}

// `categories:` is extracted first so a value like `categories:type:x`
// is not split by the `type:` pattern.
fn categories_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*categories:(\S+)").expect("valid categories regex"))
}

fn type_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*type:(\w+)").expect("valid type regex"))
}

/// Removes every occurrence of `directive` from `text` and returns the first
/// captured value.
fn extract_directive(directive: &Regex, text: &str) -> (String, Option<String>) {
    let value = directive
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string());
    let remaining = directive.replace_all(text, "").into_owned();

    (remaining, value)
}

/// Splits raw search-box input into term and filters.
///
/// Extraction runs until nothing matches, so parsing an already parsed term
/// is a no-op. Directives are removed wherever they occur, including when
/// glued to a preceding word. `type:` without a value is not a directive and
/// stays in the term.
pub fn parse_free_text(raw: &str) -> StructuredQuery {
    let mut text = raw.to_string();
    let mut content_type = None;
    let mut category = None;

    loop {
        let (without_categories, found_category) = extract_directive(categories_directive(), &text);
        let (remaining, found_type) = extract_directive(type_directive(), &without_categories);

        category = category.or(found_category);
        content_type = content_type.or(found_type);

        if remaining == text {
            break;
        }
        text = remaining;
    }

    StructuredQuery {
        term: text.trim().to_string(),
        content_type,
        category,
    }
}

/// `nginx (type: VM) (categories: infra)`. Parts that are absent are left
/// out along with their separating space.
pub fn to_display_label(query: &StructuredQuery) -> String {
    let mut parts = Vec::new();
    if !query.term.is_empty() {
        parts.push(query.term.clone());
    }
    if let Some(content_type) = &query.content_type {
        parts.push(format!("(type: {})", content_type));
    }
    if let Some(category) = &query.category {
        parts.push(format!("(categories: {})", category));
    }
    parts.join(" ")
}

/// Builds the client-side navigation URL. An empty string means no
/// navigation should happen.
pub fn to_navigation_url(query: &StructuredQuery) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut url = format!("/search?q={}", urlencoding::encode(&query.term));
    if let Some(content_type) = &query.content_type {
        url.push_str(&format!("&type={}", urlencoding::encode(content_type)));
    }
    if let Some(category) = &query.category {
        url.push_str(&format!("&categories={}", urlencoding::encode(category)));
    }
    url
}

/// Builds the package server search query string. `page` and `limit` are
/// passed through untouched.
pub fn to_api_query(query: &StructuredQuery, page: i64, limit: i64) -> String {
    let mut api_query = format!(
        "search_term={}&page={}&limit={}",
        urlencoding::encode(&query.term),
        page,
        limit
    );
    if let Some(content_type) = &query.content_type {
        api_query.push_str(&format!("&type={}", urlencoding::encode(content_type)));
    }
    if let Some(category) = &query.category {
        api_query.push_str(&format!("&categories={}", urlencoding::encode(category)));
    }
    api_query
}

/// Rebuilds a query from already-decoded URL parameters.
///
/// Explicit `type` / `categories` parameters take precedence over any
/// directive still embedded in `q`. Empty parameters count as absent.
pub fn parse_from_url_params(
    q: Option<&str>,
    content_type: Option<&str>,
    categories: Option<&str>,
) -> StructuredQuery {
    let mut query = parse_free_text(q.unwrap_or_default());

    if let Some(content_type) = non_empty(content_type) {
        query.content_type = Some(content_type.to_string());
    }
    if let Some(category) = non_empty(categories) {
        query.category = Some(category.to_string());
    }

    query
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Search-box submission: blank input is rejected without navigating or
/// touching the network.
pub fn submit(raw: &str) -> Result<String, SearchError> {
    let query = parse_free_text(raw);
    if query.is_empty() {
        debug!("Rejected empty search submission");
        return Err(SearchError::EmptySearchSubmission);
    }
    Ok(to_navigation_url(&query))
}

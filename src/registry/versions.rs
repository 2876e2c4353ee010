//! Ordering helpers for versions, categories and tokens

use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Ordering;

use super::models::{Category, TokenRest, Version};

/// Semver ordering; versions that do not parse sort before those that do
/// and fall back to plain string comparison among themselves.
pub fn compare_versions(a: &Version, b: &Version) -> Ordering {
    match (
        semver::Version::parse(&a.version),
        semver::Version::parse(&b.version),
    ) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.version.cmp(&b.version),
    }
}

pub fn sort_versions(versions: &mut [Version]) {
    versions.sort_by(compare_versions);
}

pub fn latest_version(versions: &[Version]) -> Option<&Version> {
    versions.iter().max_by(|a, b| compare_versions(a, b))
}

/// Case-insensitive name ordering
pub fn compare_categories(a: &Category, b: &Category) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Newest tokens first
pub fn sort_tokens_newest_first(tokens: &mut [TokenRest]) {
    tokens.sort_by(|a, b| {
        match (parse_timestamp(&a.created_at), parse_timestamp(&b.created_at)) {
            (Some(left), Some(right)) => right.cmp(&left),
            _ => b.created_at.cmp(&a.created_at),
        }
    });
}

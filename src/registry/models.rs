//! Package server data models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub readme_html: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub is_yanked: bool,
    #[serde(default)]
    pub readme_path: String,
    #[serde(default)]
    pub readme_html: String,
    #[serde(default)]
    pub package_size: u64,
    #[serde(default)]
    pub checksum: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A package together with its versions, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageWithVersions {
    #[serde(flatten)]
    pub package: Package,
    pub versions: Vec<Version>,
}

/// One page of packages as returned by the package server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageListResponse {
    pub packages: Vec<Package>,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub total_packages: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePage {
    pub packages: Vec<PackageWithVersions>,
    pub total_pages: i64,
    pub total_packages: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Freshly created API token; the secret value is only ever returned once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub name: String,
    pub email: String,
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// API token as listed, without its secret value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRest {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToken {
    pub name: String,
    pub email: String,
}

/// Raw package file served for previews
#[derive(Debug, Clone)]
pub struct PackageFile {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

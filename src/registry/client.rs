// src/registry/client.rs
//! HTTP client for the Deputy package server REST API

use futures::future::try_join_all;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};

use super::models::{
    Category, PackageFile, PackageListResponse, PackagePage, PackageWithVersions, PostToken, Token,
    TokenRest, Version,
};
use super::versions::{compare_categories, sort_tokens_newest_first, sort_versions};
use crate::common::safe_email_log;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Package server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to send package server request");
            RegistryError::RequestFailed(e.to_string())
        })?;

        let status = response.status();
        debug!(status = %status, url = %response.url(), "Received package server response");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<T, RegistryError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    /// Fetches every package's versions concurrently and sorts them oldest first
    async fn with_versions(
        &self,
        listing: PackageListResponse,
    ) -> Result<PackagePage, RegistryError> {
        let packages = try_join_all(listing.packages.into_iter().map(|package| async move {
            let versions = self.package_versions(&package.name).await?;
            Ok::<_, RegistryError>(PackageWithVersions { package, versions })
        }))
        .await?;

        Ok(PackagePage {
            packages,
            total_pages: listing.total_pages,
            total_packages: listing.total_packages,
        })
    }

    /// GET /api/v1/package?page=&limit=
    pub async fn list_packages(&self, page: i64, limit: i64) -> Result<PackagePage, RegistryError> {
        let url = format!("{}?page={}&limit={}", self.url("package"), page, limit);
        let listing: PackageListResponse = self.get_json(&url, None).await?;
        self.with_versions(listing).await
    }

    /// GET /api/v1/search?<api query>
    pub async fn search_packages(&self, api_query: &str) -> Result<PackagePage, RegistryError> {
        let url = format!("{}?{}", self.url("search"), api_query);
        let listing: PackageListResponse = self.get_json(&url, None).await?;
        debug!(
            result_count = listing.packages.len(),
            total = listing.total_packages,
            "Package search completed"
        );
        self.with_versions(listing).await
    }

    /// GET /api/v1/package/{name}
    pub async fn package_versions(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        let url = self.url(&format!("package/{}", urlencoding::encode(name)));
        let mut versions: Vec<Version> = self.get_json(&url, None).await?;
        sort_versions(&mut versions);
        Ok(versions)
    }

    /// GET /api/v1/package/{name}/{version}
    pub async fn package_version(&self, name: &str, version: &str) -> Result<Version, RegistryError> {
        let url = self.url(&format!(
            "package/{}/{}",
            urlencoding::encode(name),
            urlencoding::encode(version)
        ));
        self.get_json(&url, None).await
    }

    /// GET /api/v1/package/{name}/{version}/path/{file}
    ///
    /// `file` may contain `/`; each segment is encoded on its own.
    pub async fn package_file(
        &self,
        name: &str,
        version: &str,
        file: &str,
    ) -> Result<PackageFile, RegistryError> {
        let file_path = file
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = self.url(&format!(
            "package/{}/{}/path/{}",
            urlencoding::encode(name),
            urlencoding::encode(version),
            file_path
        ));

        let response = self.send(self.client.get(url)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        debug!(size = body.len(), "Loaded package file");
        Ok(PackageFile {
            content_type,
            body: body.to_vec(),
        })
    }

    /// GET /api/v1/category
    pub async fn categories(&self) -> Result<Vec<Category>, RegistryError> {
        let mut categories: Vec<Category> = self.get_json(&self.url("category"), None).await?;
        categories.sort_by(compare_categories);
        Ok(categories)
    }

    /// GET /api/v1/token
    pub async fn list_tokens(&self, id_token: &str) -> Result<Vec<TokenRest>, RegistryError> {
        let mut tokens: Vec<TokenRest> = self.get_json(&self.url("token"), Some(id_token)).await?;
        sort_tokens_newest_first(&mut tokens);
        Ok(tokens)
    }

    /// POST /api/v1/token
    pub async fn create_token(
        &self,
        id_token: &str,
        new_token: &PostToken,
    ) -> Result<Token, RegistryError> {
        let request = self
            .client
            .post(self.url("token"))
            .bearer_auth(id_token)
            .json(new_token);

        let token = self
            .send(request)
            .await?
            .json::<Token>()
            .await
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        info!(
            token_id = %token.id,
            email = %safe_email_log(&new_token.email),
            "API token created"
        );
        Ok(token)
    }

    /// DELETE /api/v1/token/{id}, returns the deleted token id
    pub async fn delete_token(&self, id_token: &str, token_id: &str) -> Result<String, RegistryError> {
        let request = self
            .client
            .delete(self.url(&format!("token/{}", urlencoding::encode(token_id))))
            .bearer_auth(id_token);

        let deleted = self
            .send(request)
            .await?
            .text()
            .await
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        info!(token_id = %token_id, "API token deleted");
        Ok(if deleted.is_empty() {
            token_id.to_string()
        } else {
            deleted
        })
    }
}

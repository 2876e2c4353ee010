//! Tests for registry module
//!
//! These tests verify:
//! - Version, category and token ordering
//! - Package server client calls
//! - File preview passthrough
//! - Token endpoints require a live session

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::registry::models::{Category, PostToken, TokenRest, Version};
    use crate::registry::versions::{
        compare_categories, latest_version, sort_tokens_newest_first, sort_versions,
    };
    use crate::session::models::UserProfile;
    use crate::session::{Session, SessionState};
    use crate::test_support::{
        body_json, spawn_provider, spawn_registry, test_client, test_credential, test_state,
        RefreshBehavior, TEST_ID_TOKEN,
    };
    use axum::{
        body::Body,
        extract::Extension,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn version(v: &str) -> Version {
        Version {
            id: format!("id-{}", v),
            version: v.to_string(),
            license: "MIT".to_string(),
            is_yanked: false,
            readme_path: String::new(),
            readme_html: String::new(),
            package_size: 0,
            checksum: String::new(),
            created_at: "2023-01-01T00:00:00Z".to_string(),
            updated_at: "2023-01-01T00:00:00Z".to_string(),
        }
    }

    fn token(id: &str, created_at: &str) -> TokenRest {
        TokenRest {
            id: id.to_string(),
            name: id.to_string(),
            created_at: created_at.to_string(),
        }
    }

    fn names(versions: &[Version]) -> Vec<&str> {
        versions.iter().map(|v| v.version.as_str()).collect()
    }

    #[test]
    fn test_versions_sort_semantically() {
        let mut versions = vec![version("1.10.0"), version("1.2.0"), version("1.9.0")];
        sort_versions(&mut versions);
        assert_eq!(names(&versions), vec!["1.2.0", "1.9.0", "1.10.0"]);
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        let mut versions = vec![version("2.0.0"), version("2.0.0-rc.1"), version("1.0.0")];
        sort_versions(&mut versions);
        assert_eq!(names(&versions), vec!["1.0.0", "2.0.0-rc.1", "2.0.0"]);
    }

    #[test]
    fn test_unparsable_versions_sort_first() {
        let mut versions = vec![version("1.0.0"), version("latest"), version("beta")];
        sort_versions(&mut versions);
        assert_eq!(names(&versions), vec!["beta", "latest", "1.0.0"]);
    }

    #[test]
    fn test_latest_version() {
        let versions = vec![version("0.9.0"), version("0.10.1"), version("0.10.0")];
        assert_eq!(latest_version(&versions).unwrap().version, "0.10.1");
        assert!(latest_version(&[]).is_none());
    }

    #[test]
    fn test_categories_sort_case_insensitively() {
        let mut categories = vec![
            Category { id: "1".to_string(), name: "networking".to_string() },
            Category { id: "2".to_string(), name: "Infra".to_string() },
            Category { id: "3".to_string(), name: "databases".to_string() },
        ];
        categories.sort_by(compare_categories);
        let sorted: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(sorted, vec!["databases", "Infra", "networking"]);
    }

    #[test]
    fn test_tokens_newest_first() {
        let mut tokens = vec![
            token("a", "2023-01-01T00:00:00Z"),
            token("b", "2023-06-01T12:00:00.123"),
            token("c", "2023-03-15T08:30:00+02:00"),
        ];
        sort_tokens_newest_first(&mut tokens);
        let ids: Vec<&str> = tokens.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_client_package_calls() {
        let registry = spawn_registry().await;
        let client = RegistryClient::new(test_client(), format!("{}/", registry.url));

        let page = client.list_packages(1, 20).await.unwrap();
        assert_eq!(page.total_packages, 2);
        assert_eq!(page.packages.len(), 2);
        assert_eq!(
            names(&page.packages[0].versions),
            vec!["1.2.0", "1.9.0", "1.10.0"]
        );

        let v = client.package_version("nginx", "1.2.0").await.unwrap();
        assert_eq!(v.version, "1.2.0");

        let categories = client.categories().await.unwrap();
        assert_eq!(categories[0].name, "databases");
    }

    #[tokio::test]
    async fn test_client_package_file() {
        let registry = spawn_registry().await;
        let client = RegistryClient::new(test_client(), registry.url.clone());

        let file = client
            .package_file("nginx", "1.2.0", "src/main file.rs")
            .await
            .unwrap();
        assert_eq!(file.content_type.as_deref(), Some("text/x-rust"));
        assert_eq!(file.body, b"// nginx/1.2.0/src/main file.rs".to_vec());

        let missing = client.package_file("nginx", "1.2.0", "missing.txt").await;
        assert!(matches!(
            missing,
            Err(RegistryError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_token_calls() {
        let registry = spawn_registry().await;
        let client = RegistryClient::new(test_client(), registry.url.clone());

        let tokens = client.list_tokens(TEST_ID_TOKEN).await.unwrap();
        assert_eq!(tokens[0].id, "t2");

        let created = client
            .create_token(
                TEST_ID_TOKEN,
                &PostToken {
                    name: "ci".to_string(),
                    email: "user@example.com".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.name, "ci");
        assert_eq!(created.token, "secret-token-value");
        assert_eq!(
            registry.created_tokens.lock().unwrap()[0]["email"],
            "user@example.com"
        );

        assert_eq!(client.delete_token(TEST_ID_TOKEN, "t1").await.unwrap(), "t1");

        let rejected = client.list_tokens("someone-else").await;
        assert!(matches!(
            rejected,
            Err(RegistryError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_client_unreachable_server() {
        let client = RegistryClient::new(test_client(), "http://127.0.0.1:1");
        assert!(matches!(
            client.categories().await,
            Err(RegistryError::RequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_package_versions_endpoint() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let app = registry_routes().layer(Extension(test_state(provider.config(), &registry.url)));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/packages/nginx")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["latest"]["version"], "1.10.0");
        assert_eq!(body["versions"][0]["version"], "1.2.0");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/packages/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_package_file_endpoint() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let app = registry_routes().layer(Extension(test_state(provider.config(), &registry.url)));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/packages/nginx/1.2.0/path/src/main.rs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/x-rust");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"// nginx/1.2.0/src/main.rs");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/packages/nginx/1.2.0/path/missing.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        for uri in [
            "/api/packages/nginx/1.2.0/path/src/../secret",
            "/api/packages/nginx/1.2.0/path/src/%2E%2E/secret",
            "/api/packages/nginx/1.2.0/path/./main.rs",
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri = {}", uri);
        }
    }

    #[tokio::test]
    async fn test_tokens_require_session() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let app = registry_routes().layer(Extension(test_state(provider.config(), &registry.url)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tokens")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NO_ACTIVE_SESSION");
    }

    #[tokio::test]
    async fn test_tokens_with_failed_session_force_sign_out() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let state = test_state(provider.config(), &registry.url);
        let app_state = state.read().await.clone();

        let mut session = Session::new(test_credential(), UserProfile::default());
        session.state = SessionState::Failed(test_credential().into_failed());
        let id = session.id;
        app_state.sessions.set(session).await;

        let response = registry_routes()
            .layer(Extension(state))
            .oneshot(
                Request::builder()
                    .uri("/api/tokens")
                    .header(header::COOKIE, format!("deputy_session={}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "REFRESH_FAILED");
        assert!(app_state.sessions.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_create_token_for_signed_in_user() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let state = test_state(provider.config(), &registry.url);
        let app_state = state.read().await.clone();

        let session = Session::new(
            test_credential(),
            UserProfile {
                email: Some("user@example.com".to_string()),
                name: None,
            },
        );
        let id = session.id;
        app_state.sessions.set(session).await;

        let response = registry_routes()
            .layer(Extension(state))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tokens")
                    .header(header::COOKIE, format!("deputy_session={}", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"ci"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["token"], "secret-token-value");
        assert_eq!(
            registry.created_tokens.lock().unwrap()[0]["name"],
            "ci"
        );
    }

    #[tokio::test]
    async fn test_create_token_requires_email() {
        let provider = spawn_provider(RefreshBehavior::Succeed).await;
        let registry = spawn_registry().await;
        let state = test_state(provider.config(), &registry.url);
        let app_state = state.read().await.clone();

        let session = Session::new(test_credential(), UserProfile::default());
        let id = session.id;
        app_state.sessions.set(session).await;

        let response = registry_routes()
            .layer(Extension(state))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tokens")
                    .header(header::COOKIE, format!("deputy_session={}", id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"ci"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(registry.created_tokens.lock().unwrap().is_empty());
    }
}

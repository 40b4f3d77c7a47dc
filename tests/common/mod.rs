#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{app_router, auth::user, config::AppConfig, db, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "k9#Lp2@vQ8!zR4$wT6%yU1^aS3&dF5*g";
const BOUNDARY: &str = "storefront-test-boundary";

/// One part of a multipart upload body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Helper harness: application router over a SQLite file in a temp dir.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub user_id: i32,
    token: String,
    dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_SECRET.to_string(),
        );
        cfg.environment = "test".to_string();
        cfg.uploads_dir = dir.path().join("uploads").display().to_string();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let now = Utc::now();
        let seeded = user::ActiveModel {
            username: Set("catalog-admin".to_string()),
            email: Set("admin@example.com".to_string()),
            password: Set("not-a-usable-hash".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&pool)
        .await
        .expect("seed user");

        let state = AppState::new(Arc::new(pool), cfg);
        let token = state
            .auth
            .generate_token(seeded.id)
            .expect("sign test token");

        Self {
            router: app_router(state.clone()),
            state,
            user_id: seeded.id,
            token,
            dir,
        }
    }

    /// Bearer token for the seeded user.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn uploads_dir(&self) -> std::path::PathBuf {
        self.state.config.uploads_path()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// `POST /uploads` with a hand-built multipart body.
    pub async fn upload(&self, parts: &[Part<'_>], token: Option<&str>) -> Response {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        self.send(builder.body(Body::from(body)).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a category through the API and returns its id.
    pub async fn create_category(&self, name: &str, slug: &str) -> i64 {
        let response = self
            .request_authenticated(
                Method::POST,
                "/createCategoria",
                Some(serde_json::json!({"name": name, "slug": slug})),
            )
            .await;
        assert_eq!(response.status(), 201, "category seed failed");
        body_json(response).await["id"]
            .as_i64()
            .expect("category id")
    }

    /// Creates a product through the API and returns its id.
    pub async fn create_product(&self, body: Value) -> i64 {
        let response = self
            .request_authenticated(Method::POST, "/createProduto", Some(body))
            .await;
        assert_eq!(response.status(), 201, "product seed failed");
        body_json(response).await["data"]["id"]
            .as_i64()
            .expect("product id")
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec()
}

//! Storefront API library
//!
//! Products, categories, accounts and product image uploads served over
//! axum, persisted with sea-orm.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod queries;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, routing::get, Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
};

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::config::AppConfig;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::new(
            config.jwt_secret.clone(),
            config.jwt_lifetime(),
        )));
        let services = handlers::AppServices::new(db.clone(), auth.clone(), &config);

        Self {
            db,
            config: Arc::new(config),
            services,
            auth,
        }
    }
}

/// Product and category routes, behind the bearer token unless
/// `auth_required` is off.
pub fn catalog_routes(auth_required: bool) -> Router<AppState> {
    let catalog = Router::new()
        .merge(handlers::products::products_routes())
        .merge(handlers::categories::categories_routes());

    if auth_required {
        catalog.with_auth()
    } else {
        catalog
    }
}

/// Explicit origins when configured; permissive in development, same-origin otherwise.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(config.cors_allow_credentials)
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router with the request-id, auth-service, CORS,
/// compression and tracing layers applied.
pub fn app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .merge(health::health_routes())
        .merge(catalog_routes(config.auth_required))
        .merge(handlers::users::users_routes())
        .merge(handlers::uploads::uploads_routes(config.max_upload_bytes))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config))
        // auth_middleware reads the service from request extensions
        .layer(Extension(state.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

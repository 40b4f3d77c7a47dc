//! HTTP handlers, one module per resource.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{
    CategoryService, ProductCatalogService, UploadService, UserService,
};

pub mod categories;
pub mod common;
pub mod products;
pub mod uploads;
pub mod users;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
    pub categories: Arc<CategoryService>,
    pub users: Arc<UserService>,
    pub uploads: Arc<UploadService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth_service: Arc<AuthService>, config: &AppConfig) -> Self {
        let product_catalog = ProductCatalogService::new(db_pool.clone());
        let uploads = UploadService::new(product_catalog.clone(), config.uploads_path());

        Self {
            product_catalog: Arc::new(product_catalog),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool, auth_service)),
            uploads: Arc::new(uploads),
        }
    }
}

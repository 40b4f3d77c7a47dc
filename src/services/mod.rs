//! Business logic behind the HTTP handlers. Each service owns a pool
//! handle and returns [`ServiceError`](crate::errors::ServiceError).

pub mod category;
pub mod product_catalog;
pub mod uploads;
pub mod users;

pub use category::{CategoryPage, CategoryPayload, CategoryService};
pub use product_catalog::{ProductCatalogService, ProductPage, ProductPayload, ProductView};
pub use uploads::{UploadService, UploadedFile};
pub use users::{CreateUserInput, LoginInput, UpdatePasswordInput, UserService};

//! Product image uploads: type check, file storage and the image row.

use axum::body::Bytes;
use chrono::Utc;
use metrics::counter;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

use crate::entities::product_image;
use crate::errors::ServiceError;
use crate::services::product_catalog::ProductCatalogService;

pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// Public URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "uploads";

/// A file part received from a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Keeps the final path segment of a client-supplied name and replaces
/// anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn is_allowed_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .is_some_and(|ct| ALLOWED_IMAGE_TYPES.contains(&ct.as_str()))
}

#[derive(Clone)]
pub struct UploadService {
    catalog: ProductCatalogService,
    uploads_dir: PathBuf,
}

impl UploadService {
    pub fn new(catalog: ProductCatalogService, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Stores `file` and attaches it to the product. Nothing is written for
    /// a rejected type or a missing product.
    #[instrument(skip(self, file), fields(file_name = ?file.file_name, size = file.bytes.len()))]
    pub async fn store_product_image(
        &self,
        product_id: i32,
        user_id: Option<i32>,
        file: UploadedFile,
    ) -> Result<product_image::Model, ServiceError> {
        if !is_allowed_type(file.content_type.as_deref()) {
            counter!("storefront.uploads.rejected", 1);
            return Err(ServiceError::UnsupportedMedia(
                "Unsupported file type. Only JPEG, PNG and JPG are allowed.".to_string(),
            ));
        }
        if !self.catalog.product_exists(product_id).await? {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        let stored_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(file.file_name.as_deref().unwrap_or_default())
        );
        let target = self.uploads_dir.join(&stored_name);
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(&target, &file.bytes).await?;

        let public_path = format!("{PUBLIC_PREFIX}/{stored_name}");
        match self.catalog.add_image(product_id, user_id, public_path).await {
            Ok(image) => {
                counter!("storefront.uploads.stored", 1);
                info!(image_id = image.id, product_id, "Stored product image");
                Ok(image)
            }
            Err(err) => {
                if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                    error!(error = %cleanup, path = %target.display(), "failed to remove orphaned upload");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use sea_orm::{ConnectOptions, Database};
    use std::sync::Arc;

    #[rstest]
    #[case("photo.png", "photo.png")]
    #[case("../../etc/passwd", "passwd")]
    #[case("C:\\Users\\me\\shoe 1.jpg", "shoe_1.jpg")]
    #[case(".hidden", "hidden")]
    #[case("", "image")]
    fn sanitizes_client_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(raw), expected);
    }

    #[rstest]
    #[case(Some("image/png"), true)]
    #[case(Some("image/JPEG"), true)]
    #[case(Some("image/jpg; charset=binary"), true)]
    #[case(Some("image/gif"), false)]
    #[case(Some("text/plain"), false)]
    #[case(None, false)]
    fn accepts_only_jpeg_and_png(#[case] content_type: Option<&str>, #[case] allowed: bool) {
        assert_eq!(is_allowed_type(content_type), allowed);
    }

    async fn service(dir: &Path) -> UploadService {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        UploadService::new(ProductCatalogService::new(Arc::new(db)), dir.join("uploads"))
    }

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: Some("front.png".into()),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
        }
    }

    #[tokio::test]
    async fn rejected_type_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        let mut file = png();
        file.content_type = Some("application/pdf".into());

        assert_matches!(
            service.store_product_image(1, None, file).await,
            Err(ServiceError::UnsupportedMedia(_))
        );
        assert!(!service.uploads_dir().exists());
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        assert_matches!(
            service.store_product_image(3, None, png()).await,
            Err(ServiceError::NotFound(_))
        );
        assert!(!service.uploads_dir().exists());
    }

    #[tokio::test]
    async fn stored_image_is_linked_to_product() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;
        let product = service
            .catalog
            .create_product(
                serde_json::from_value(serde_json::json!({"name": "Runner", "price": 12.5}))
                    .unwrap(),
            )
            .await
            .unwrap();

        let image = service
            .store_product_image(product.id, None, png())
            .await
            .unwrap();
        assert!(image.enabled);
        assert!(image.path.starts_with("uploads/"));
        assert!(image.path.ends_with("-front.png"));

        let file_name = image.path.trim_start_matches("uploads/");
        let written = std::fs::read(service.uploads_dir().join(file_name)).unwrap();
        assert_eq!(written, b"\x89PNG\r\n\x1a\n");

        let view = service.catalog.get_product(product.id).await.unwrap();
        assert_eq!(view.images.len(), 1);
        assert_eq!(view.images[0].content, image.path);
    }
}

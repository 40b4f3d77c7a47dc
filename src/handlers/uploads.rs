//! Image upload (`POST /uploads`, multipart) and stored file serving
//! (`GET /uploads/<file>`).

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::errors::{ApiError, ServiceError};
use crate::handlers::common::{created_response, parse_id};
use crate::services::uploads::sanitize_file_name;
use crate::services::UploadedFile;
use crate::AppState;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "imagem";
pub const PRODUCT_FIELD: &str = "product_id";

pub fn uploads_routes(max_upload_bytes: usize) -> Router<AppState> {
    let protected = Router::new()
        .route("/uploads", post(upload_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_auth();

    Router::new()
        .route("/uploads/*file", get(serve_upload))
        .merge(protected)
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::plain(ServiceError::ValidationError(message.into()))
}

async fn upload_image(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    let mut file = None;
    let mut product_id = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some(PRODUCT_FIELD) => {
                product_id = Some(field.text().await.map_err(|e| bad_request(e.body_text()))?);
            }
            // `userId` from older clients is ignored; the token decides.
            _ => {}
        }
    }

    let file = file.ok_or_else(|| bad_request("No image file was sent"))?;
    let product_id = product_id.ok_or_else(|| bad_request("product_id is required"))?;
    let product_id = parse_id(&product_id, "product").map_err(ApiError::plain)?;

    let image = state
        .services
        .uploads
        .store_product_image(product_id, Some(caller.user_id), file)
        .await
        .map_err(ApiError::plain)?;

    Ok(created_response(json!({
        "message": "Image uploaded successfully",
        "imagem": image,
    })))
}

async fn serve_upload(
    State(state): State<AppState>,
    Path(file): Path<String>,
    request: Request,
) -> Response {
    if file.is_empty() || sanitize_file_name(&file) != file {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.services.uploads.uploads_dir().join(&file);
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

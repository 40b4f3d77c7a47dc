//! `/produtos` routes. Errors use the `{success:false, message, error?}` body.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::errors::ApiError;
use crate::handlers::common::{created_response, json_body, parse_id, success_response};
use crate::queries::listing::{ProductListPlan, ProductListQuery};
use crate::services::ProductPayload;
use crate::AppState;

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/produtos", get(list_products))
        .route("/produtos/:id", get(get_product))
        .route("/createProduto", post(create_product))
        .route("/updateProduto/:id", put(update_product))
        .route("/deleteProduto/:id", delete(delete_product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ApiError> {
    let plan = ProductListPlan::from_query(&query).map_err(ApiError::product)?;
    let page = state
        .services
        .product_catalog
        .list_products(&plan)
        .await
        .map_err(ApiError::product)?;

    Ok(success_response(json!({
        "data": page.records,
        "total": page.total,
        "limit": plan.list.pagination.take,
        "page": plan.list.pagination.page,
    })))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product").map_err(ApiError::product)?;
    let product = state
        .services
        .product_catalog
        .get_product(id)
        .await
        .map_err(ApiError::product)?;
    Ok(success_response(product))
}

async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(body).map_err(ApiError::product)?;
    let product = state
        .services
        .product_catalog
        .create_product(payload)
        .await
        .map_err(ApiError::product)?;

    Ok(created_response(json!({
        "success": true,
        "data": product,
        "message": "Product created successfully",
    })))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product").map_err(ApiError::product)?;
    let payload = json_body(body).map_err(ApiError::product)?;
    let product = state
        .services
        .product_catalog
        .update_product(id, payload)
        .await
        .map_err(ApiError::product)?;

    Ok(success_response(json!({
        "success": true,
        "data": product,
        "message": "Product updated successfully",
    })))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product").map_err(ApiError::product)?;
    state
        .services
        .product_catalog
        .delete_product(id)
        .await
        .map_err(ApiError::product)?;

    Ok(success_response(json!({
        "success": true,
        "message": "Product deleted successfully",
    })))
}

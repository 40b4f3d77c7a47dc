//! `/categoria` routes. Errors use the `{message, error?}` body.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::errors::ApiError;
use crate::handlers::common::{created_response, json_body, parse_id, success_response};
use crate::queries::listing::{ListPlan, ListQuery, Projection};
use crate::services::CategoryPayload;
use crate::AppState;

pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/categoria", get(list_categories))
        .route("/categoria/:id", get(get_category))
        .route("/createCategoria", post(create_category))
        .route("/updateCategoria/:id", put(update_category))
        .route("/deleteCategoria/:id", delete(delete_category))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let plan = ListPlan::for_categories(&query).map_err(ApiError::plain)?;
    let page = state
        .services
        .categories
        .list_categories(&plan)
        .await
        .map_err(ApiError::plain)?;

    Ok(success_response(json!({
        "data": page.records,
        "meta": {
            "total": page.total,
            "totalPages": plan.pagination.total_pages(page.total),
            "currentPage": plan.pagination.page,
        }
    })))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category").map_err(ApiError::plain)?;
    let projection = Projection::parse(query.fields.as_deref(), Projection::All);
    let category = state
        .services
        .categories
        .get_category(id, &projection)
        .await
        .map_err(ApiError::plain)?;
    Ok(success_response(category))
}

async fn create_category(
    State(state): State<AppState>,
    body: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(body).map_err(ApiError::plain)?;
    let category = state
        .services
        .categories
        .create_category(payload)
        .await
        .map_err(ApiError::plain)?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category").map_err(ApiError::plain)?;
    let payload = json_body(body).map_err(ApiError::plain)?;
    let category = state
        .services
        .categories
        .update_category(id, payload)
        .await
        .map_err(ApiError::plain)?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category").map_err(ApiError::plain)?;
    state
        .services
        .categories
        .delete_category(id)
        .await
        .map_err(ApiError::plain)?;
    Ok(success_response(json!({ "message": "Category removed successfully" })))
}

//! Account routes. Errors use the `{error:true, message, errorMessage?}` body.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    routing::{post, put},
    Json, Router,
};
use serde_json::json;

use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, json_body, success_response};
use crate::services::{CreateUserInput, LoginInput, UpdatePasswordInput};
use crate::AppState;

pub fn users_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/updatePassword", put(update_password))
        .with_auth();

    Router::new()
        .route("/createUser", post(create_user))
        .route("/login", post(login))
        .merge(protected)
}

async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = json_body(body).map_err(ApiError::account)?;
    let user = state
        .services
        .users
        .create_user(input)
        .await
        .map_err(ApiError::account)?;

    Ok(created_response(json!({
        "error": false,
        "message": "User created successfully",
        "user": user,
    })))
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = json_body(body).map_err(ApiError::account)?;
    let token = state
        .services
        .users
        .login(input)
        .await
        .map_err(ApiError::account)?;

    Ok(success_response(json!({
        "error": false,
        "message": "Login successful",
        "token": token,
    })))
}

async fn update_password(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    body: Result<Json<UpdatePasswordInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let input = json_body(body).map_err(ApiError::account)?;
    let user = state
        .services
        .users
        .update_password(caller.user_id, input)
        .await
        .map_err(ApiError::account)?;

    Ok(success_response(json!({
        "error": false,
        "message": "Password updated successfully",
        "user": user,
    })))
}

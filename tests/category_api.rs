mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_category_defaults_use_in_menu() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/createCategoria",
            Some(json!({"name": "Shoes", "slug": "shoes"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Shoes");
    assert_eq!(body["slug"], "shoes");
    assert_eq!(body["use_in_menu"], false);
    assert!(body["id"].is_i64());
}

#[tokio::test]
async fn create_category_without_slug_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::POST, "/createCategoria", Some(json!({"name": "Shoes"})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body, json!({"message": "name and slug are required"}));
}

#[tokio::test]
async fn unlimited_listing_is_a_single_page() {
    let app = TestApp::new().await;
    for name in ["Shoes", "Shirts", "Hats"] {
        app.create_category(name, &name.to_lowercase()).await;
    }

    let response = app
        .request_authenticated(Method::GET, "/categoria?limit=-1", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["meta"], json!({"total": 3, "totalPages": 1, "currentPage": 1}));
}

#[tokio::test]
async fn listing_pages_and_projects_fields() {
    let app = TestApp::new().await;
    for name in ["A", "B", "C", "D", "E"] {
        app.create_category(name, &name.to_lowercase()).await;
    }

    let response = app
        .request_authenticated(Method::GET, "/categoria?limit=2&page=3&fields=name,slug", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"], json!([{"name": "E", "slug": "e"}]));
    assert_eq!(body["meta"], json!({"total": 5, "totalPages": 3, "currentPage": 3}));
}

#[tokio::test]
async fn malformed_paging_is_rejected() {
    let app = TestApp::new().await;

    for uri in [
        "/categoria?limit=abc",
        "/categoria?limit=0",
        "/categoria?page=0",
        "/categoria?limit=10000000000&page=10000000000",
    ] {
        let response = app.request_authenticated(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn get_category_supports_projection() {
    let app = TestApp::new().await;
    let id = app.create_category("Shoes", "shoes").await;

    let response = app
        .request_authenticated(Method::GET, &format!("/categoria/{id}?fields=slug"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"slug": "shoes"}));

    let response = app
        .request_authenticated(Method::GET, "/categoria/999", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Category not found"})
    );
}

#[tokio::test]
async fn update_is_a_partial_patch() {
    let app = TestApp::new().await;
    let id = app.create_category("Shoes", "shoes").await;

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/updateCategoria/{id}"),
            Some(json!({"use_in_menu": true})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"id": id, "name": "Shoes", "slug": "shoes", "use_in_menu": true}));
}

#[tokio::test]
async fn update_and_delete_missing_category_are_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::PUT, "/updateCategoria/404", Some(json!({"name": "x"})))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request_authenticated(Method::DELETE, "/deleteCategoria/404", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_category_then_it_is_gone() {
    let app = TestApp::new().await;
    let id = app.create_category("Shoes", "shoes").await;

    let response = app
        .request_authenticated(Method::DELETE, &format!("/deleteCategoria/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Category removed successfully"})
    );

    let response = app
        .request_authenticated(Method::GET, &format!("/categoria/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(Method::GET, "/categoria/abc", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn categories_require_a_token_by_default() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/categoria", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "AUTH_MISSING");
}

#[tokio::test]
async fn categories_are_public_when_auth_is_disabled() {
    let app = TestApp::with_config(|cfg| cfg.auth_required = false).await;
    let response = app.request(Method::GET, "/categoria", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

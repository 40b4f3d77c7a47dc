mod common;

use axum::http::{Method, StatusCode};
use common::{body_bytes, body_json, Part, TestApp};
use serde_json::json;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

fn png_part(bytes: &[u8]) -> Part<'_> {
    Part::File {
        name: "imagem",
        file_name: "front view.png",
        content_type: "image/png",
        bytes,
    }
}

#[tokio::test]
async fn upload_stores_file_and_links_image() {
    let app = TestApp::new().await;
    let product_id = app
        .create_product(json!({"name": "Cap", "price": 9.99}))
        .await
        .to_string();

    let response = app
        .upload(
            &[Part::Text("product_id", &product_id), png_part(PNG_BYTES)],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert!(body["message"].is_string());
    let image = &body["imagem"];
    assert_eq!(image["product_id"].to_string(), product_id);
    assert_eq!(image["user_id"], app.user_id);
    assert_eq!(image["enabled"], true);
    let path = image["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("uploads/"));
    assert!(path.ends_with("-front_view.png"));

    let stored = app.uploads_dir().join(path.trim_start_matches("uploads/"));
    assert_eq!(std::fs::read(&stored).unwrap(), PNG_BYTES);

    // served back publicly
    let response = app
        .request(Method::GET, &format!("/{path}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, PNG_BYTES);

    // and visible on the product
    let response = app
        .request_authenticated(Method::GET, &format!("/produtos/{product_id}"), None)
        .await;
    let product = body_json(response).await;
    assert_eq!(product["images"][0]["content"], path);
}

#[tokio::test]
async fn unsupported_type_is_rejected_without_writing() {
    let app = TestApp::new().await;
    let product_id = app
        .create_product(json!({"name": "Cap", "price": 9.99}))
        .await
        .to_string();

    let response = app
        .upload(
            &[
                Part::Text("product_id", &product_id),
                Part::File {
                    name: "imagem",
                    file_name: "notes.txt",
                    content_type: "text/plain",
                    bytes: b"hello",
                },
            ],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body_json(response).await["message"].is_string());

    let written = std::fs::read_dir(app.uploads_dir())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .upload(
            &[Part::Text("product_id", "4242"), png_part(PNG_BYTES)],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_file_or_product_id_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .upload(&[Part::Text("product_id", "1")], Some(app.token()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.upload(&[png_part(PNG_BYTES)], Some(app.token())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload(
            &[Part::Text("product_id", "abc"), png_part(PNG_BYTES)],
            Some(app.token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_requires_a_token() {
    let app = TestApp::with_config(|cfg| cfg.auth_required = false).await;
    let response = app
        .upload(&[Part::Text("product_id", "1"), png_part(PNG_BYTES)], None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let app = TestApp::with_config(|cfg| cfg.max_upload_bytes = 1024).await;
    let product_id = app
        .create_product(json!({"name": "Cap", "price": 9.99}))
        .await
        .to_string();
    let big = vec![0u8; 4096];

    let response = app
        .upload(
            &[Part::Text("product_id", &product_id), png_part(&big)],
            Some(app.token()),
        )
        .await;
    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn unknown_upload_file_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/uploads/nothing-here.png", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

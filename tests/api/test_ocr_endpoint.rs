// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /ocr/detect
//!
//! Validation tests need no models. The full run needs real weights:
//! set MANGA_DETECTOR_MODEL and MANGA_OCR_MODEL_DIR, then run with
//! `--ignored`.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use manga_inference::vision::image_utils::MAX_IMAGE_SIZE;
use manga_inference::{create_router, AppState, DeviceKind, ServiceConfig};
use tempfile::TempDir;
use tower::util::ServiceExt;

use super::common::{json_body, png_bytes, router_without_models, upload_request, Part};

#[tokio::test]
async fn test_non_image_content_type_is_rejected() {
    let request = upload_request(
        "/ocr/detect",
        &[Part::File {
            name: "file",
            file_name: "notes.txt",
            content_type: Some("text/plain"),
            bytes: b"hello",
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["detail"], "File must be an image");
}

#[tokio::test]
async fn test_missing_content_type_is_rejected() {
    let png = png_bytes(4, 4);
    let request = upload_request(
        "/ocr/detect",
        &[Part::File {
            name: "file",
            file_name: "page.png",
            content_type: None,
            bytes: &png,
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["detail"], "File must be an image");
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let request = upload_request(
        "/ocr/detect",
        &[Part::Text {
            name: "original_path",
            value: "/library/page.png",
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "validation_error");
    assert_eq!(json["details"]["field"], "file");
}

#[tokio::test]
async fn test_undecodable_image_is_rejected() {
    let request = upload_request(
        "/ocr/detect",
        &[Part::File {
            name: "file",
            file_name: "page.png",
            content_type: Some("image/png"),
            bytes: b"definitely not a png",
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "invalid_request");
    assert!(json["detail"].as_str().unwrap().starts_with("Invalid image"));
}

#[tokio::test]
async fn test_missing_models_return_503() {
    let png = png_bytes(32, 48);
    let request = upload_request(
        "/ocr/detect",
        &[Part::File {
            name: "file",
            file_name: "page.png",
            content_type: Some("image/png"),
            bytes: &png,
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "service_unavailable");
    assert!(json["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let bytes = vec![0u8; MAX_IMAGE_SIZE + 2 * 1024 * 1024];
    let request = upload_request(
        "/ocr/detect",
        &[Part::File {
            name: "file",
            file_name: "huge.png",
            content_type: Some("image/png"),
            bytes: &bytes,
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_body(response).await;
    assert_eq!(json["errorType"], "payload_too_large");
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/ocr/detect")
        .body(Body::empty())
        .unwrap();
    let response = router_without_models().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_json_body_is_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/ocr/detect")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"image":"..."}"#))
        .unwrap();
    let response = router_without_models().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

/// Full detection run against real weights
#[tokio::test]
#[ignore]
async fn test_detect_with_models() {
    let (Ok(detector), Ok(ocr_dir)) = (
        std::env::var("MANGA_DETECTOR_MODEL"),
        std::env::var("MANGA_OCR_MODEL_DIR"),
    ) else {
        eprintln!("MANGA_DETECTOR_MODEL / MANGA_OCR_MODEL_DIR not set, skipping");
        return;
    };

    let debug_dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        detector_model: detector.into(),
        ocr_model_dir: ocr_dir.into(),
        device: DeviceKind::Cpu,
        debug_images: true,
        ..ServiceConfig::default()
    };
    let state = AppState::new(config);
    let app = create_router(state.clone());

    let png = png_bytes(640, 960);
    let original_path = debug_dir.path().join("blank.png");
    let original_path = original_path.to_string_lossy();
    let request = upload_request(
        "/ocr/detect",
        &[
            Part::File {
                name: "file",
                file_name: "blank.png",
                content_type: Some("image/png"),
                bytes: &png,
            },
            Part::Text {
                name: "original_path",
                value: &original_path,
            },
        ],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["imageSize"]["width"], 640);
    assert_eq!(json["imageSize"]["height"], 960);
    assert!(json["textBlocks"].is_array());
    assert!(debug_dir.path().join("blank_debug.png").exists());
    assert!(state.models.is_loaded());
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /ocr/text-only

use axum::http::StatusCode;
use manga_inference::{create_router, AppState, DeviceKind, ServiceConfig};
use tower::util::ServiceExt;

use super::common::{json_body, png_bytes, router_without_models, upload_request, Part};

#[tokio::test]
async fn test_non_image_is_rejected() {
    let request = upload_request(
        "/ocr/text-only",
        &[Part::File {
            name: "file",
            file_name: "scan.pdf",
            content_type: Some("application/pdf"),
            bytes: b"%PDF-1.4",
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["detail"], "File must be an image");
}

#[tokio::test]
async fn test_empty_form_is_rejected() {
    let request = upload_request("/ocr/text-only", &[]);
    let response = router_without_models().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_models_return_503() {
    let png = png_bytes(24, 96);
    let request = upload_request(
        "/ocr/text-only",
        &[Part::File {
            name: "file",
            file_name: "bubble.png",
            content_type: Some("image/png"),
            bytes: &png,
        }],
    );
    let response = router_without_models().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Direct OCR against real weights
#[tokio::test]
#[ignore]
async fn test_text_only_with_models() {
    let (Ok(detector), Ok(ocr_dir)) = (
        std::env::var("MANGA_DETECTOR_MODEL"),
        std::env::var("MANGA_OCR_MODEL_DIR"),
    ) else {
        eprintln!("MANGA_DETECTOR_MODEL / MANGA_OCR_MODEL_DIR not set, skipping");
        return;
    };

    let config = ServiceConfig {
        detector_model: detector.into(),
        ocr_model_dir: ocr_dir.into(),
        device: DeviceKind::Cpu,
        debug_images: false,
        ..ServiceConfig::default()
    };
    let app = create_router(AppState::new(config));

    let png = png_bytes(64, 256);
    let request = upload_request(
        "/ocr/text-only",
        &[Part::File {
            name: "file",
            file_name: "bubble.png",
            content_type: Some("image/png"),
            bytes: &png,
        }],
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["method"], "direct_ocr");
    assert_eq!(json["imageSize"]["width"], 64);
    assert!(json["text"].is_string());
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use manga_inference::{create_router, AppState, ServiceConfig};
use tower::util::ServiceExt;

use super::common::{config_without_models, json_body, router_without_models};

fn health_request() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_service() {
    let response = router_without_models()
        .oneshot(health_request())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "manga-inference");
    assert_eq!(json["config"]["debug_images_enabled"], false);
    assert_eq!(json["models"]["loaded"], false);
    assert!(json["models"]["device"].is_null());
}

#[tokio::test]
async fn test_health_reflects_debug_flag() {
    let config = ServiceConfig {
        debug_images: true,
        ..config_without_models()
    };
    let response = create_router(AppState::new(config))
        .oneshot(health_request())
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["config"]["debug_images_enabled"], true);
}

#[tokio::test]
async fn test_health_does_not_load_models() {
    let state = AppState::new(config_without_models());
    let app = create_router(state.clone());

    let response = app.oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.models.is_loaded());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/v1/models")
        .body(Body::empty())
        .unwrap();
    let response = router_without_models().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! VisionModelManager loading behaviour

use manga_inference::vision::{VisionModelConfig, VisionModelManager};
use manga_inference::{DeviceKind, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn missing_config() -> VisionModelConfig {
    VisionModelConfig {
        detector_model: PathBuf::from("/nonexistent/comictextdetector.pt.onnx"),
        ocr_model_dir: PathBuf::from("/nonexistent/manga-ocr"),
        device: DeviceKind::Cpu,
        intra_threads: 1,
    }
}

fn real_config() -> Option<VisionModelConfig> {
    let detector = std::env::var("MANGA_DETECTOR_MODEL").ok()?;
    let ocr_dir = std::env::var("MANGA_OCR_MODEL_DIR").ok()?;
    Some(VisionModelConfig {
        detector_model: detector.into(),
        ocr_model_dir: ocr_dir.into(),
        device: DeviceKind::Cpu,
        intra_threads: 2,
    })
}

#[test]
fn test_default_config_matches_service_defaults() {
    let config = VisionModelConfig::default();
    let service = ServiceConfig::default();
    assert_eq!(config.detector_model, service.detector_model);
    assert_eq!(config.ocr_model_dir, service.ocr_model_dir);
    assert_eq!(config.device, DeviceKind::Auto);
}

#[test]
fn test_missing_detector_is_reported() {
    let manager = VisionModelManager::new(missing_config());
    let err = tokio_test::assert_err!(tokio_test::block_on(manager.get_or_init()));
    let message = format!("{:#}", err);
    assert!(message.contains("comictextdetector.pt.onnx"), "{}", message);
    assert!(!manager.is_loaded());
}

#[tokio::test]
async fn test_concurrent_failures_leave_manager_empty() {
    let manager = Arc::new(VisionModelManager::new(missing_config()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_or_init().await.is_err() })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert!(manager.get().is_none());
    assert!(manager.device().is_none());
}

#[tokio::test]
#[ignore]
async fn test_models_load_once() {
    let Some(config) = real_config() else {
        eprintln!("MANGA_DETECTOR_MODEL / MANGA_OCR_MODEL_DIR not set, skipping");
        return;
    };
    let manager = Arc::new(VisionModelManager::new(config));

    let (a, b) = tokio::join!(manager.get_or_init(), manager.get_or_init());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert!(manager.is_loaded());
    assert_eq!(manager.device(), Some(a.device));
    assert!(manager.list_models().iter().all(|m| m.available));
}

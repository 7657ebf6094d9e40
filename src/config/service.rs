// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Every setting can come from a CLI flag or an environment variable.
//! `.env` files are loaded in `main` before parsing.

use clap::{ArgAction, Args, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Legacy frontend/backend origins kept for older clients
const LEGACY_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3001"];

/// Requested execution device for ONNX Runtime sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// CUDA when available, CPU otherwise
    Auto,
    Cpu,
    Cuda,
}

/// Only the literal "true" (any case) enables a flag, everything else disables it.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

/// Runtime configuration for the inference service
#[derive(Args, Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "INFERENCE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "INFERENCE_PORT", default_value_t = 8847)]
    pub port: u16,

    /// Port of the frontend allowed through CORS
    #[arg(long, env = "FRONTEND_PORT", default_value_t = 5847)]
    pub frontend_port: u16,

    /// Port of the backend allowed through CORS
    #[arg(long, env = "BACKEND_PORT", default_value_t = 3847)]
    pub backend_port: u16,

    /// Write an annotated debug image for every detection request
    #[arg(
        long,
        env = "GENERATE_DEBUG_IMAGES",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_flag
    )]
    pub debug_images: bool,

    /// Directory for debug images when the client sends no original path
    #[arg(long, env = "DEBUG_IMAGE_DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Font used for debug image labels (tried before the built-in list)
    #[arg(long, env = "DEBUG_FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// comic-text-detector ONNX model file
    #[arg(
        long,
        env = "DETECTOR_MODEL_PATH",
        default_value = "./models/comictextdetector.pt.onnx"
    )]
    pub detector_model: PathBuf,

    /// Directory holding the manga-ocr ONNX files and vocab.txt
    #[arg(long, env = "MANGA_OCR_MODEL_DIR", default_value = "./models/manga-ocr")]
    pub ocr_model_dir: PathBuf,

    /// Execution device for both models
    #[arg(long, env = "INFERENCE_DEVICE", value_enum, default_value_t = DeviceKind::Auto)]
    pub device: DeviceKind,

    /// Intra-op thread count for each ONNX Runtime session
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Hugging Face repository hosting the detector weights
    #[arg(long, env = "DETECTOR_REPO", default_value = "mayocream/koharu")]
    pub detector_repo: String,

    /// Detector file name inside `detector_repo`
    #[arg(long, env = "DETECTOR_FILE", default_value = "comictextdetector.onnx")]
    pub detector_file: String,

    /// Hugging Face repository hosting manga-ocr ONNX weights
    #[arg(long, env = "MANGA_OCR_REPO")]
    pub ocr_repo: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8847,
            frontend_port: 5847,
            backend_port: 3847,
            debug_images: true,
            debug_dir: None,
            font_path: None,
            detector_model: PathBuf::from("./models/comictextdetector.pt.onnx"),
            ocr_model_dir: PathBuf::from("./models/manga-ocr"),
            device: DeviceKind::Auto,
            intra_threads: 4,
            detector_repo: "mayocream/koharu".to_string(),
            detector_file: "comictextdetector.onnx".to_string(),
            ocr_repo: None,
        }
    }
}

impl ServiceConfig {
    /// Socket address the server binds to
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    /// Origins accepted by the CORS layer
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins = vec![
            format!("http://localhost:{}", self.frontend_port),
            format!("http://localhost:{}", self.backend_port),
        ];
        for legacy in LEGACY_ORIGINS {
            if !origins.iter().any(|o| o == legacy) {
                origins.push((*legacy).to_string());
            }
        }
        origins
    }

    /// Directory debug images fall back to
    pub fn debug_dir(&self) -> PathBuf {
        self.debug_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

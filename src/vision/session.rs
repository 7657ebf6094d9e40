// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session construction and device selection

use anyhow::{Context, Result};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::DeviceKind;

/// Device a session actually runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Whether the CUDA execution provider can be used in this process
pub fn cuda_available() -> bool {
    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            debug!("CUDA availability check failed: {}", e);
            false
        }
    }
}

/// Resolve the requested device kind to a concrete device
pub fn resolve_device(kind: DeviceKind) -> Device {
    match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda => {
            if !cuda_available() {
                warn!("CUDA requested but the provider reports unavailable, sessions fall back to CPU");
            }
            Device::Cuda
        }
        DeviceKind::Auto => {
            if cuda_available() {
                Device::Cuda
            } else {
                Device::Cpu
            }
        }
    }
}

fn execution_providers(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        // CPU stays registered so unsupported nodes still run
        Device::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
    }
}

/// Build an ONNX Runtime session for a model file
///
/// # Arguments
/// - `model_path`: ONNX file to load
/// - `label`: Human readable model name used in errors and logs
/// - `device`: Execution device
/// - `intra_threads`: Intra-op thread count
///
/// # Errors
/// Returns error if the file is missing or ONNX Runtime rejects it.
pub fn build_session(
    model_path: &Path,
    label: &str,
    device: Device,
    intra_threads: usize,
) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("{} not found: {}", label, model_path.display());
    }

    info!("Loading {} from {} ({})", label, model_path.display(), device);

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers(execution_providers(device))
        .context("Failed to set execution providers")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads.max(1))
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load {} from {}",
            label,
            model_path.display()
        ))?;

    let input_names: Vec<_> = session.inputs.iter().map(|i| &i.name).collect();
    let output_names: Vec<_> = session.outputs.iter().map(|o| &o.name).collect();
    debug!(
        "{} loaded - inputs: {:?}, outputs: {:?}",
        label, input_names, output_names
    );

    Ok(session)
}

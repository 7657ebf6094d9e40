// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! comic-text-detector ONNX model
//!
//! One forward pass yields three heads:
//! - `blk`: YOLO block predictions `[1, N, 7]`
//! - `seg`: text segmentation mask `[1, 1, 1024, 1024]`
//! - `det`: line shrink/threshold maps `[1, 2, 1024, 1024]`

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use ndarray::{s, ArrayD, ArrayView2, Ix4};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::lines::extract_lines;
use super::preprocessing::{preprocess_for_detector, Letterbox};
use super::textblock::{group_blocks, TextBlock};
use super::yolo::{decode_blocks, nms, scale_blocks, CONF_THRESHOLD, NMS_THRESHOLD};
use crate::vision::session::{build_session, Device};

/// Indices of the three detector heads in the session outputs
#[derive(Debug, Clone, Copy, PartialEq)]
struct OutputIndices {
    blocks: usize,
    mask: usize,
    lines: usize,
}

/// Result of running the detector on a page
#[derive(Debug, Clone)]
pub struct Detection {
    /// Blocks in reading order
    pub blocks: Vec<TextBlock>,
    /// Text mask at page resolution (0-255)
    pub mask: GrayImage,
}

/// comic-text-detector model
#[derive(Clone)]
pub struct ComicTextDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    outputs: OutputIndices,
    device: Device,
}

impl std::fmt::Debug for ComicTextDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComicTextDetector")
            .field("input_name", &self.input_name)
            .field("outputs", &self.outputs)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Position of a named output, else its conventional index
fn resolve_output(names: &[String], wanted: &str, fallback: usize) -> usize {
    names.iter().position(|n| n == wanted).unwrap_or(fallback)
}

/// Segmentation head cropped to the page region and scaled to page size
fn mask_from_segmentation(seg: &ArrayD<f32>, letterbox: &Letterbox) -> Result<GrayImage> {
    let seg = seg
        .view()
        .into_dimensionality::<Ix4>()
        .context("Segmentation output is not 4-dimensional")?;
    let (_, _, height, width) = seg.dim();
    let rw = (letterbox.resized_width as usize).min(width);
    let rh = (letterbox.resized_height as usize).min(height);

    let cropped = GrayImage::from_fn(rw as u32, rh as u32, |x, y| {
        let value = seg[[0, 0, y as usize, x as usize]] * 255.0;
        Luma([value.clamp(0.0, 255.0) as u8])
    });

    Ok(image::imageops::resize(
        &cropped,
        letterbox.orig_width,
        letterbox.orig_height,
        FilterType::Triangle,
    ))
}

/// Shrink map (channel 0 of the line head) over the unpadded region
fn shrink_map<'a>(det: &'a ArrayD<f32>, letterbox: &Letterbox) -> Result<ArrayView2<'a, f32>> {
    let det = det
        .view()
        .into_dimensionality::<Ix4>()
        .context("Line output is not 4-dimensional")?;
    let (_, _, height, width) = det.dim();
    let rw = (letterbox.resized_width as usize).min(width);
    let rh = (letterbox.resized_height as usize).min(height);
    Ok(det.slice_move(s![0, 0, ..rh, ..rw]))
}

impl ComicTextDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime fails to load it.
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, intra_threads: usize) -> Result<Self> {
        let session = build_session(
            model_path.as_ref(),
            "Text detector model",
            device,
            intra_threads,
        )?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());
        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let outputs = OutputIndices {
            blocks: resolve_output(&names, "blk", 0),
            mask: resolve_output(&names, "seg", 1),
            lines: resolve_output(&names, "det", 2),
        };
        if names.len() < 3 {
            anyhow::bail!(
                "Text detector model has {} outputs, expected blk, seg and det",
                names.len()
            );
        }

        info!("✅ Text detector loaded ({})", device);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            outputs,
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Detect text blocks and lines on a page
    pub fn detect(&self, image: &DynamicImage) -> Result<Detection> {
        let (width, height) = image.dimensions();
        let (input, letterbox) = preprocess_for_detector(image);

        let (blk, seg, det) = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow::anyhow!("Detector session lock poisoned: {}", e))?;

            let input_value = Value::from_array(input).context("Failed to create input tensor")?;
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("Detector inference failed")?;

            let extract = |idx: usize, label: &str| -> Result<ArrayD<f32>> {
                Ok(outputs[idx]
                    .try_extract_array::<f32>()
                    .context(format!("Failed to extract {} output", label))?
                    .to_owned())
            };
            (
                extract(self.outputs.blocks, "block")?,
                extract(self.outputs.mask, "mask")?,
                extract(self.outputs.lines, "line")?,
            )
        };
        debug!(
            "Detector outputs - blk: {:?}, seg: {:?}, det: {:?}",
            blk.shape(),
            seg.shape(),
            det.shape()
        );

        let candidates = decode_blocks(&blk.view(), CONF_THRESHOLD)?;
        let kept = nms(candidates, NMS_THRESHOLD);
        let detected = scale_blocks(&kept, &letterbox);

        let mask = mask_from_segmentation(&seg, &letterbox)?;
        let lines = extract_lines(shrink_map(&det, &letterbox)?, width, height);
        debug!(
            "Detector found {} blocks and {} lines",
            detected.len(),
            lines.len()
        );

        let blocks = group_blocks(&detected, &lines, width, height, Some(&mask));

        Ok(Detection { blocks, mask })
    }
}

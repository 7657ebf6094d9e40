// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text block decoding from the detector's YOLO head

use anyhow::Context;
use ndarray::{ArrayViewD, Ix3};

use super::preprocessing::Letterbox;
use crate::vision::geometry::iou;

/// Minimum objectness and class confidence for a block
pub const CONF_THRESHOLD: f32 = 0.4;

/// IoU above which overlapping blocks of the same class are suppressed
pub const NMS_THRESHOLD: f32 = 0.35;

/// Columns per row: cx, cy, w, h, objectness, then one score per class
const BOX_COLUMNS: usize = 5;

/// A block candidate in detector input coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBlock {
    /// `[x1, y1, x2, y2]`
    pub xyxy: [f32; 4],
    /// Objectness times class score
    pub confidence: f32,
    /// Index of the best class
    pub class_id: usize,
}

/// A block in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedBlock {
    pub xyxy: [i32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

/// Decode `[1, N, 5 + classes]` predictions into candidates above the threshold
pub fn decode_blocks(output: &ArrayViewD<f32>, conf_threshold: f32) -> anyhow::Result<Vec<RawBlock>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[2] <= BOX_COLUMNS {
        anyhow::bail!(
            "Unexpected block output shape: {:?}, expected [1, N, >5]",
            shape
        );
    }

    let rows = shape[1];
    let columns = shape[2];
    let output = output
        .view()
        .into_dimensionality::<Ix3>()
        .context("Block output is not 3-dimensional")?;
    let mut blocks = Vec::new();

    for i in 0..rows {
        let objectness = output[[0, i, 4]];
        if objectness <= conf_threshold {
            continue;
        }

        let (class_id, class_score) = (BOX_COLUMNS..columns)
            .map(|c| (c - BOX_COLUMNS, output[[0, i, c]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        let confidence = objectness * class_score;
        if confidence <= conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (
            output[[0, i, 0]],
            output[[0, i, 1]],
            output[[0, i, 2]],
            output[[0, i, 3]],
        );
        blocks.push(RawBlock {
            xyxy: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence,
            class_id,
        });
    }

    Ok(blocks)
}

/// Class-aware non-maximum suppression
///
/// Candidates are visited by descending confidence; a candidate is dropped
/// when it overlaps an already kept block of the same class above the threshold.
pub fn nms(mut blocks: Vec<RawBlock>, iou_threshold: f32) -> Vec<RawBlock> {
    if blocks.len() <= 1 {
        return blocks;
    }

    blocks.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<RawBlock> = Vec::with_capacity(blocks.len());
    for candidate in blocks {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(k.xyxy, candidate.xyxy) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Map kept blocks back to page coordinates, clipped to the page
pub fn scale_blocks(blocks: &[RawBlock], letterbox: &Letterbox) -> Vec<DetectedBlock> {
    let (sx, sy) = letterbox.scale();
    let (w, h) = (letterbox.orig_width as f32, letterbox.orig_height as f32);

    blocks
        .iter()
        .map(|b| DetectedBlock {
            xyxy: [
                (b.xyxy[0] * sx).clamp(0.0, w) as i32,
                (b.xyxy[1] * sy).clamp(0.0, h) as i32,
                (b.xyxy[2] * sx).clamp(0.0, w) as i32,
                (b.xyxy[3] * sy).clamp(0.0, h) as i32,
            ],
            confidence: (b.confidence * 1000.0).round() / 1000.0,
            class_id: b.class_id,
        })
        .collect()
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection plus per-line OCR
//!
//! The detector finds blocks and line polygons; every line is cropped,
//! oriented and passed through manga-ocr. Line failures are recorded and
//! never abort the page.

use anyhow::Result;
use image::{DynamicImage, GenericImageView, RgbImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::crop::{prepare_line_for_ocr, transformed_region};
use super::debug_image::DebugRenderer;
use super::detection::TextBlock;
use super::model_manager::MangaModels;

/// Characters of block text echoed in the debug log
const LOG_TEXT_CHARS: usize = 50;

/// Confidence reported for every block
pub const BLOCK_CONFIDENCE: f32 = 1.0;

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One recognized text block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockResult {
    /// Tight bbox over the line polygons `[x1, y1, x2, y2]`
    pub bbox: [i32; 4],
    pub width: i32,
    pub height: i32,
    pub vertical: bool,
    pub font_size: f32,
    /// Number of lines
    pub lines: usize,
    /// Always `BLOCK_CONFIDENCE`
    pub confidence: f32,
    /// Line texts joined without separator
    pub text: String,
    pub text_lines: Vec<String>,
}

/// Result of detection plus OCR on a page
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    pub blocks: Vec<BlockResult>,
    pub image_size: ImageSize,
    /// Human readable trace of the run
    pub debug: Vec<String>,
    pub debug_image_path: Option<PathBuf>,
}

/// Result of OCR on a whole image
#[derive(Debug, Clone)]
pub struct DirectOcrOutput {
    pub text: String,
    pub image_size: ImageSize,
}

/// Where and how to write the debug image
#[derive(Debug, Clone, Copy)]
pub struct DebugTarget<'a> {
    pub renderer: &'a DebugRenderer,
    /// The image is written next to this path as `{stem}_debug{ext}`
    pub base_path: &'a Path,
    /// Create the parent directory when missing, otherwise it must exist
    pub create_parent: bool,
}

/// Clients match on `True` / `False` in the summary lines
fn capitalized_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Block summary line for the debug log
pub fn block_summary(index: usize, block: &BlockResult) -> String {
    let [x1, y1, x2, y2] = block.bbox;
    let head: String = block.text.chars().take(LOG_TEXT_CHARS).collect();
    let ellipsis = if block.text.chars().count() > LOG_TEXT_CHARS {
        "..."
    } else {
        ""
    };
    format!(
        "Block {}: bbox=[{}, {}, {}, {}] vertical={} font_size={} lines={} text='{}{}'",
        index + 1,
        x1,
        y1,
        x2,
        y2,
        capitalized_bool(block.vertical),
        block.font_size,
        block.lines,
        head,
        ellipsis
    )
}

/// OCR every line of a block; failed lines yield empty strings
fn recognize_lines<R>(
    recognize: &R,
    page: &RgbImage,
    block: &TextBlock,
    block_idx: usize,
    debug_log: &mut Vec<String>,
) -> Vec<String>
where
    R: Fn(&DynamicImage) -> Result<String>,
{
    let text_height = block.text_height();

    (0..block.lines.len())
        .map(|line_idx| {
            let recognized = transformed_region(page, block, line_idx, text_height).and_then(|crop| {
                let line = prepare_line_for_ocr(crop, block.vertical);
                recognize(&DynamicImage::ImageRgb8(line))
            });

            match recognized {
                Ok(text) => text,
                Err(e) => {
                    let message = format!(
                        "Failed to extract text from line {} in block {}: {}",
                        line_idx,
                        block_idx + 1,
                        e
                    );
                    warn!("{}", message);
                    debug_log.push(message);
                    String::new()
                }
            }
        })
        .collect()
}

/// OCR every line of already detected blocks
///
/// `recognize` reads one upright line crop. The debug image, when
/// requested, is written after all blocks are read; a failure to write it
/// is only recorded in the debug log.
pub fn recognize_blocks<R>(
    page: &RgbImage,
    blocks: &[TextBlock],
    recognize: R,
    debug_target: Option<DebugTarget<'_>>,
) -> DetectionOutput
where
    R: Fn(&DynamicImage) -> Result<String>,
{
    let (width, height) = page.dimensions();
    let mut debug_log = vec![format!("Found {} text blocks", blocks.len())];
    info!("Found {} text blocks", blocks.len());

    let mut results = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        let bbox = block.tight_bbox();
        let text_lines = recognize_lines(&recognize, page, block, i, &mut debug_log);

        let result = BlockResult {
            bbox,
            width: bbox[2] - bbox[0],
            height: bbox[3] - bbox[1],
            vertical: block.vertical,
            font_size: block.font_size,
            lines: block.lines.len(),
            confidence: BLOCK_CONFIDENCE,
            text: text_lines.concat(),
            text_lines,
        };

        let summary = block_summary(i, &result);
        debug!("{}", summary);
        debug_log.push(summary);
        results.push(result);
    }

    debug_log.push(format!(
        "Final results: {} text blocks with extracted text",
        results.len()
    ));

    let debug_image_path = debug_target.and_then(|target| {
        let texts: Vec<String> = results.iter().map(|b| b.text.clone()).collect();
        match target
            .renderer
            .save(page, blocks, &texts, target.base_path, target.create_parent)
        {
            Ok(path) => {
                debug_log.push(format!(
                    "Debug image with text saved to: {}",
                    path.display()
                ));
                Some(path)
            }
            Err(e) => {
                warn!("Failed to generate debug image: {:#}", e);
                debug_log.push(format!("Failed to generate debug image: {:#}", e));
                None
            }
        }
    });

    DetectionOutput {
        blocks: results,
        image_size: ImageSize { width, height },
        debug: debug_log,
        debug_image_path,
    }
}

/// Detect text blocks on a page and OCR each line
///
/// # Process
/// 1. Run the detector
/// 2. For each block, compute the tight bbox and OCR every line
/// 3. Join line texts into the block text
/// 4. Optionally write the debug image
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn run_ocr_detection(
    models: &MangaModels,
    image: &DynamicImage,
    debug_target: Option<DebugTarget<'_>>,
) -> Result<DetectionOutput> {
    let page = image.to_rgb8();
    let detection = models.detector.detect(image)?;

    Ok(recognize_blocks(
        &page,
        &detection.blocks,
        |line| models.ocr.recognize(line),
        debug_target,
    ))
}

/// OCR a whole image without detection, for pre-cropped text
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn run_direct_ocr(models: &MangaModels, image: &DynamicImage) -> Result<DirectOcrOutput> {
    let (width, height) = image.dimensions();
    let text = models.ocr.recognize(image)?;
    debug!("Direct OCR extracted text: '{}'", text);

    Ok(DirectOcrOutput {
        text,
        image_size: ImageSize { width, height },
    })
}

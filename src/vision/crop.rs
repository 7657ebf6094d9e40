// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-line crops for OCR
//!
//! Each line polygon is warped onto an upright rectangle whose short side
//! equals the block's text height.

use anyhow::{Context, Result};
use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use super::detection::{Language, TextBlock};
use super::geometry::{line_vectors, norm, Quad};

/// Smallest crop side accepted by the warp
const MIN_CROP_SIDE: u32 = 2;

/// Grow a horizontal line polygon by `amount` above and below
fn expand_vertically(quad: Quad, amount: f32, height: f32) -> Quad {
    let [tl, tr, br, bl] = quad;
    [
        [tl[0], (tl[1] - amount).max(0.0)],
        [tr[0], (tr[1] - amount).max(0.0)],
        [br[0], (br[1] + amount).min(height)],
        [bl[0], (bl[1] + amount).min(height)],
    ]
}

/// Warp one line of a block onto an upright rectangle
///
/// Horizontal lines come out `text_height` tall; vertical lines come out
/// `text_height` wide and are then rotated 90° counter-clockwise.
///
/// # Errors
/// Returns error if `line_idx` is out of range or the line polygon is degenerate.
pub fn transformed_region(
    image: &RgbImage,
    block: &TextBlock,
    line_idx: usize,
    text_height: u32,
) -> Result<RgbImage> {
    let mut quad = *block
        .lines
        .get(line_idx)
        .with_context(|| format!("Line {} out of range ({} lines)", line_idx, block.lines.len()))?;

    if !block.vertical && block.language != Language::Ja {
        quad = expand_vertically(quad, block.font_size / 3.0, image.height() as f32);
    }
    let quad = quad.map(|[x, y]| [x.round(), y.round()]);

    let (vec_v, vec_h) = line_vectors(&quad);
    let (norm_v, norm_h) = (norm(vec_v), norm(vec_h));
    if norm_v <= 0.0 || norm_h <= 0.0 {
        anyhow::bail!("Degenerate line polygon: {:?}", quad);
    }
    let ratio = norm_v / norm_h;
    let text_height = text_height as f32;

    let (width, height) = if block.vertical {
        (text_height, (text_height * ratio).round())
    } else {
        ((text_height / ratio).round(), text_height)
    };
    let width = (width as u32).max(MIN_CROP_SIDE);
    let height = (height as u32).max(MIN_CROP_SIDE);

    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let from = quad.map(|[x, y]| (x, y));
    let to = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let projection = Projection::from_control_points(from, to)
        .with_context(|| format!("No perspective transform for line polygon {:?}", quad))?;

    let mut region = RgbImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut region,
    );

    if block.vertical {
        Ok(imageops::rotate270(&region))
    } else {
        Ok(region)
    }
}

/// Orient a line crop for manga-ocr
///
/// Vertical crops are rotated 90° clockwise so the text runs top to bottom.
pub fn prepare_line_for_ocr(region: RgbImage, vertical: bool) -> RgbImage {
    if vertical {
        imageops::rotate90(&region)
    } else {
        region
    }
}

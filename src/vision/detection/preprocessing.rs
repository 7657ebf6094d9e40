// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for comic-text-detector

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

/// Square input size of the detector
pub const DETECTOR_INPUT_SIZE: u32 = 1024;

/// Geometry of a letterboxed detector input
///
/// The page is resized by one ratio and padded on the right and bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Original page width
    pub orig_width: u32,
    /// Original page height
    pub orig_height: u32,
    /// Resized (unpadded) width inside the input
    pub resized_width: u32,
    /// Resized (unpadded) height inside the input
    pub resized_height: u32,
    /// Padding added on the right
    pub pad_width: u32,
    /// Padding added at the bottom
    pub pad_height: u32,
    /// Input side length
    pub input_size: u32,
}

impl Letterbox {
    /// Compute the letterbox for a page of the given size
    pub fn new(orig_width: u32, orig_height: u32, input_size: u32) -> Self {
        let w = orig_width.max(1) as f32;
        let h = orig_height.max(1) as f32;
        let ratio = (input_size as f32 / h).min(input_size as f32 / w);

        let resized_width = ((w * ratio).round() as u32).clamp(1, input_size);
        let resized_height = ((h * ratio).round() as u32).clamp(1, input_size);

        Self {
            orig_width,
            orig_height,
            resized_width,
            resized_height,
            pad_width: input_size - resized_width,
            pad_height: input_size - resized_height,
            input_size,
        }
    }

    /// Factors mapping input coordinates back to page coordinates
    pub fn scale(&self) -> (f32, f32) {
        (
            self.orig_width as f32 / self.resized_width as f32,
            self.orig_height as f32 / self.resized_height as f32,
        )
    }
}

/// Preprocess a page for the detector
///
/// Steps:
/// 1. Convert to RGB
/// 2. Resize by a single ratio so the longer side fits DETECTOR_INPUT_SIZE
/// 3. Pad right and bottom with black
/// 4. Scale to [0, 1]
/// 5. Convert to NCHW tensor format [1, 3, 1024, 1024]
pub fn preprocess_for_detector(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let (orig_w, orig_h) = image.dimensions();
    let letterbox = Letterbox::new(orig_w, orig_h, DETECTOR_INPUT_SIZE);

    let rgb: RgbImage = if (orig_w, orig_h) == (letterbox.resized_width, letterbox.resized_height)
    {
        image.to_rgb8()
    } else {
        image::imageops::resize(
            &image.to_rgb8(),
            letterbox.resized_width,
            letterbox.resized_height,
            FilterType::Triangle,
        )
    };

    let size = DETECTOR_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    // Padding stays zero
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}

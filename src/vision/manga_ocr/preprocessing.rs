// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for manga-ocr

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Square input size of the manga-ocr vision encoder
pub const MANGA_OCR_INPUT_SIZE: u32 = 224;

/// Preprocess an image for manga-ocr
///
/// Steps:
/// 1. Convert to grayscale, then back to 3 channels
/// 2. Resize to 224x224 (bilinear, aspect ratio not kept)
/// 3. Normalize to [-1, 1]: (x / 255 - 0.5) / 0.5
/// 4. Convert to NCHW tensor format [1, 3, 224, 224]
pub fn preprocess_for_manga_ocr(image: &DynamicImage) -> Array4<f32> {
    let gray = DynamicImage::ImageLuma8(image.to_luma8()).to_rgb8();
    let resized = image::imageops::resize(
        &gray,
        MANGA_OCR_INPUT_SIZE,
        MANGA_OCR_INPUT_SIZE,
        FilterType::Triangle,
    );

    let size = MANGA_OCR_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = (pixel[c] as f32 / 255.0 - 0.5) / 0.5;
        }
    }

    tensor
}

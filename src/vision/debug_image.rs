// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated debug images for detection results
//!
//! Each block gets its tight bbox, its number, the recognized text and its
//! line polygons drawn onto a copy of the page.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::detection::TextBlock;

/// Fonts tried after the configured one, Japanese-capable first
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/fonts-japanese-gothic.ttf",
    "/usr/share/fonts/truetype/takao-gothic/TakaoGothic.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/Arial Unicode MS.ttf",
    "/Windows/Fonts/msyh.ttc",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/Windows/Fonts/arial.ttf",
];

const FONT_SIZE: f32 = 24.0;
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LINE_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
const TEXT_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 3;
const LINE_THICKNESS: i32 = 2;
const MAX_LABEL_CHARS: usize = 30;

/// Path of the debug image for a base path: `{parent}/{stem}_debug{ext}`
///
/// Bases without an extension get `.png`.
pub fn debug_image_path(base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());

    let file_name = format!("{}_debug.{}", stem, ext);
    match base.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// First 30 characters, with `...` when cut
pub fn truncate_label(text: &str) -> String {
    if text.chars().count() > MAX_LABEL_CHARS {
        let head: String = text.chars().take(MAX_LABEL_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn read_font(path: &Path) -> Option<FontVec> {
    if !path.exists() {
        return None;
    }
    match std::fs::read(path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| FontVec::try_from_vec_and_index(bytes, 0).map_err(anyhow::Error::from))
    {
        Ok(font) => {
            info!("Debug image font loaded: {}", path.display());
            Some(font)
        }
        Err(e) => {
            debug!("Failed to load font {}: {}", path.display(), e);
            None
        }
    }
}

/// Draws detection results onto page copies
pub struct DebugRenderer {
    font: Option<FontVec>,
}

impl std::fmt::Debug for DebugRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl DebugRenderer {
    /// Load the preferred font, falling back to `FONT_CANDIDATES`
    ///
    /// Without any font, labels and text are skipped.
    pub fn new(preferred_font: Option<&Path>) -> Self {
        let font = preferred_font
            .and_then(read_font)
            .or_else(|| FONT_CANDIDATES.iter().find_map(|p| read_font(Path::new(p))));

        if font.is_none() {
            warn!("No debug image font found, labels will be omitted");
        }
        Self { font }
    }

    /// Renderer that draws boxes and lines only
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw blocks and their texts onto a copy of `page`
    pub fn render(&self, page: &RgbImage, blocks: &[TextBlock], texts: &[String]) -> RgbImage {
        let mut canvas = page.clone();
        let scale = PxScale::from(FONT_SIZE);

        for (i, block) in blocks.iter().enumerate() {
            let [x1, y1, x2, y2] = block.tight_bbox();

            for k in 0..BOX_THICKNESS {
                let (w, h) = (x2 - x1 + 1 - 2 * k, y2 - y1 + 1 - 2 * k);
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + k, y1 + k).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let label = (i + 1).to_string();
                draw_text_mut(
                    &mut canvas,
                    BOX_COLOR,
                    x1,
                    (y1 - 25).max(5),
                    scale,
                    font,
                    &label,
                );

                let text = texts.get(i).map(String::as_str).unwrap_or("");
                if !text.is_empty() {
                    let text_y = if y1 > 50 { y1 - 50 } else { y2 + 10 };
                    let display = truncate_label(text);
                    let (tw, th) = text_size(scale, font, &display);

                    let background = Rect::at(x1 - 2, text_y - 2).of_size(tw + 4, th + 4);
                    draw_filled_rect_mut(&mut canvas, background, TEXT_BACKGROUND);
                    draw_text_mut(&mut canvas, TEXT_COLOR, x1, text_y, scale, font, &display);
                }
            }

            for line in &block.lines {
                for offset in 0..LINE_THICKNESS {
                    let d = offset as f32;
                    for p in 0..4 {
                        let a = line[p];
                        let b = line[(p + 1) % 4];
                        draw_line_segment_mut(
                            &mut canvas,
                            (a[0].trunc() + d, a[1].trunc() + d),
                            (b[0].trunc() + d, b[1].trunc() + d),
                            LINE_COLOR,
                        );
                    }
                }
            }
        }

        canvas
    }

    /// Render and save next to `base_path`, returning the written path
    ///
    /// The parent directory is only created with `create_parent`; otherwise
    /// a missing directory is an error.
    pub fn save(
        &self,
        page: &RgbImage,
        blocks: &[TextBlock],
        texts: &[String],
        base_path: &Path,
        create_parent: bool,
    ) -> Result<PathBuf> {
        let path = debug_image_path(base_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if create_parent {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            } else if !parent.is_dir() {
                anyhow::bail!("Debug image directory does not exist: {}", parent.display());
            }
        }

        let canvas = self.render(page, blocks, texts);
        canvas
            .save(&path)
            .with_context(|| format!("Failed to save debug image to: {}", path.display()))?;

        debug!("Debug image written to {}", path.display());
        Ok(path)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text blocks: grouping of line polygons, orientation, font size and reading order

use image::GrayImage;
use serde::Serialize;

use super::lines::TextLine;
use super::yolo::DetectedBlock;
use crate::vision::geometry::{
    intersection_area, line_vectors, norm, quad_bounds, tight_bbox, xyxy_to_quad, Quad,
};

/// Minimum share of a line's area that must fall inside a block to join it
const LINE_ASSIGN_THRESHOLD: f32 = 0.4;

/// Minimum mean mask value (0..1) for regions without a matching block or line
const MASK_SCORE_THRESHOLD: f32 = 0.1;

/// Angles below this many degrees are treated as upright
const ANGLE_TOLERANCE: i32 = 3;

/// Reading-order grid
const GRID_COLUMNS: f64 = 3.0;
const GRID_ROWS: f64 = 4.0;

/// Script the detector classified a block as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Eng,
    Ja,
    Unknown,
}

impl Language {
    /// Map a detector class index to a language
    pub fn from_class(class_id: usize) -> Self {
        match class_id {
            0 => Language::Eng,
            1 => Language::Ja,
            _ => Language::Unknown,
        }
    }
}

/// A detected text block with its line polygons
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// Detector box `[x1, y1, x2, y2]`
    pub xyxy: [i32; 4],
    /// Line polygons in reading order once examined
    pub lines: Vec<Quad>,
    pub language: Language,
    pub vertical: bool,
    /// Estimated font size in pixels
    pub font_size: f32,
    /// Rotation of the text lines in degrees
    pub angle: i32,
    /// Detector score
    pub confidence: f32,
    /// Per-line distance from the reading origin
    distances: Vec<f32>,
}

impl TextBlock {
    pub fn new(xyxy: [i32; 4], lines: Vec<Quad>, language: Language, confidence: f32) -> Self {
        Self {
            xyxy,
            lines,
            language,
            vertical: false,
            font_size: 0.0,
            angle: 0,
            confidence,
            distances: Vec::new(),
        }
    }

    /// Tight bounding box over every line polygon (detector box without lines)
    pub fn tight_bbox(&self) -> [i32; 4] {
        tight_bbox(&self.lines, self.xyxy)
    }

    /// Height used for line crops; 20 when the block has no font size
    pub fn text_height(&self) -> u32 {
        let size = self.font_size.round();
        if size >= 1.0 {
            size as u32
        } else {
            20
        }
    }

    /// Derive orientation, font size, angle and line distances from the lines
    ///
    /// Vertical text is read right to left, so its origin is the top-right
    /// page corner. With `sort`, lines are reordered by distance.
    pub fn examine(&mut self, im_w: u32, _im_h: u32, sort: bool) {
        if self.lines.is_empty() {
            return;
        }

        let count = self.lines.len() as f32;
        let mut sum_v = [0.0f32; 2];
        let mut sum_h = [0.0f32; 2];
        let mut centers = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            let (v, h) = line_vectors(line);
            sum_v = [sum_v[0] + v[0], sum_v[1] + v[1]];
            sum_h = [sum_h[0] + h[0], sum_h[1] + h[1]];

            let cx = line.iter().map(|p| p[0]).sum::<f32>() / 4.0;
            let cy = line.iter().map(|p| p[1]).sum::<f32>() / 4.0;
            centers.push([cx, cy]);
        }

        let norm_v = norm(sum_v);
        let norm_h = norm(sum_h);
        let vertical = match self.language {
            Language::Ja => norm_v > norm_h,
            _ => norm_v > norm_h * 2.0,
        };

        let (primary, origin, font_size) = if vertical {
            (sum_v, [im_w as f32, 0.0], (norm_h / count).round())
        } else {
            (sum_h, [0.0, 0.0], (norm_v / count).round())
        };

        let mut angle = primary[1].atan2(primary[0]).to_degrees() as i32;
        if vertical {
            angle -= 90;
        }
        if angle.abs() < ANGLE_TOLERANCE {
            angle = 0;
        }

        let primary_norm = norm(primary);
        self.distances = centers
            .iter()
            .map(|c| {
                let d = [c[0] - origin[0], c[1] - origin[1]];
                if primary_norm > 0.0 {
                    (d[0] * primary[1] - d[1] * primary[0]).abs() / primary_norm
                } else {
                    norm(d)
                }
            })
            .collect();

        self.lines = self
            .lines
            .iter()
            .map(|q| q.map(|[x, y]| [x.trunc(), y.trunc()]))
            .collect();
        self.vertical = vertical;
        self.font_size = font_size;
        self.angle = angle;

        if sort {
            self.sort_lines();
        }
    }

    fn sort_lines(&mut self) {
        let mut paired: Vec<(f32, Quad)> = self
            .distances
            .iter()
            .copied()
            .zip(self.lines.iter().copied())
            .collect();
        paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        self.distances = paired.iter().map(|(d, _)| *d).collect();
        self.lines = paired.into_iter().map(|(_, q)| q).collect();
    }

    /// Recompute the block box from its lines
    fn fit_to_lines(&mut self) {
        self.xyxy = tight_bbox(&self.lines, self.xyxy);
    }

    /// Split at gaps wider than twice the font size between consecutive lines
    ///
    /// Expects an examined, sorted block.
    pub fn split(self, im_w: u32, im_h: u32) -> Vec<TextBlock> {
        if self.lines.len() < 2 || self.distances.len() != self.lines.len() {
            return vec![self];
        }

        let tolerance = self.font_size.max(1.0) * 2.0;
        let mut groups: Vec<Vec<Quad>> = vec![vec![self.lines[0]]];
        for i in 1..self.lines.len() {
            if self.distances[i] - self.distances[i - 1] > tolerance {
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(self.lines[i]);
            }
        }

        if groups.len() == 1 {
            return vec![self];
        }

        groups
            .into_iter()
            .map(|lines| {
                let mut block = TextBlock::new(self.xyxy, lines, self.language, self.confidence);
                block.fit_to_lines();
                block.examine(im_w, im_h, true);
                block
            })
            .collect()
    }
}

/// Mean mask value (0..1) over `[x1, x2) x [y1, y2)`, zero for empty regions
fn mask_score(mask: &GrayImage, xyxy: [i32; 4]) -> f32 {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let x1 = xyxy[0].clamp(0, w);
    let y1 = xyxy[1].clamp(0, h);
    let x2 = xyxy[2].clamp(0, w);
    let y2 = xyxy[3].clamp(0, h);
    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let mut sum = 0u64;
    for y in y1..y2 {
        for x in x1..x2 {
            sum += mask.get_pixel(x as u32, y as u32)[0] as u64;
        }
    }
    let count = ((x2 - x1) * (y2 - y1)) as f32;
    sum as f32 / count / 255.0
}

fn has_enough_mask(mask: Option<&GrayImage>, xyxy: [i32; 4]) -> bool {
    match mask {
        Some(mask) => mask_score(mask, xyxy) >= MASK_SCORE_THRESHOLD,
        None => true,
    }
}

fn bounds_i32(bounds: [f32; 4]) -> [i32; 4] {
    bounds.map(|v| v as i32)
}

/// Whether two single-orientation scattered blocks continue each other
fn can_merge(a: &TextBlock, b: &TextBlock) -> bool {
    if a.vertical != b.vertical {
        return false;
    }

    let (fa, fb) = (a.font_size.max(1.0), b.font_size.max(1.0));
    if fa.min(fb) / fa.max(fb) < 0.5 {
        return false;
    }
    let font = fa.max(fb);

    let [ax1, ay1, ax2, ay2] = a.xyxy.map(|v| v as f32);
    let [bx1, by1, bx2, by2] = b.xyxy.map(|v| v as f32);

    // Reading axis overlap and cross axis gap
    let (overlap, shorter, gap) = if a.vertical {
        (
            ay2.min(by2) - ay1.max(by1),
            (ay2 - ay1).min(by2 - by1),
            ax1.max(bx1) - ax2.min(bx2),
        )
    } else {
        (
            ax2.min(bx2) - ax1.max(bx1),
            (ax2 - ax1).min(bx2 - bx1),
            ay1.max(by1) - ay2.min(by2),
        )
    };

    shorter > 0.0 && overlap >= shorter * 0.5 && gap <= font
}

/// Merge scattered single-line blocks that belong to the same text
pub fn merge_scattered(mut blocks: Vec<TextBlock>, im_w: u32, im_h: u32) -> Vec<TextBlock> {
    'outer: loop {
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                if can_merge(&blocks[i], &blocks[j]) {
                    let other = blocks.remove(j);
                    let target = &mut blocks[i];
                    target.lines.extend(other.lines);
                    target.confidence = target.confidence.max(other.confidence);
                    target.fit_to_lines();
                    target.examine(im_w, im_h, false);
                    continue 'outer;
                }
            }
        }
        break;
    }

    for block in &mut blocks {
        block.examine(im_w, im_h, true);
    }
    blocks
}

/// Order blocks for reading on a 3x4 grid
///
/// Mostly-Japanese pages are read right to left. Pages wider than tall are
/// treated as two-page spreads and the second page sorts after the first.
pub fn sort_reading_order(blocks: &mut [TextBlock], im_w: u32, im_h: u32) {
    if blocks.is_empty() {
        return;
    }

    let num_ja = blocks.iter().filter(|b| b.language == Language::Ja).count();
    let flip_lr = num_ja as f64 > blocks.len() as f64 / 2.0;

    let page_w_full = im_w.max(1) as f64;
    let page_h = im_h.max(1) as f64;
    let spread = page_w_full > page_h;
    let page_w = if spread { page_w_full / 2.0 } else { page_w_full };
    let area = page_w * page_h;

    let weight = |block: &TextBlock| -> f64 {
        let [x1, y1, x2, y2] = block.xyxy.map(|v| v as f64);
        let mut cx = (x1 + x2) / 2.0;
        if flip_lr {
            cx = page_w_full - cx;
        }
        let cy = (y1 + y2) / 2.0;

        let gx = (cx / page_w * GRID_COLUMNS).floor();
        let gy = (cy / page_h * GRID_ROWS).floor();
        let mut w = (gy * GRID_COLUMNS + gx) * area
            + 1.2 * (cx - gx * page_w / GRID_COLUMNS)
            + (cy - gy * page_h / GRID_ROWS);
        if spread && gx >= GRID_COLUMNS {
            w += area * GRID_ROWS * GRID_COLUMNS;
        }
        w
    };

    blocks.sort_by(|a, b| {
        weight(a)
            .partial_cmp(&weight(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Assign lines to detector blocks and build the final block list
///
/// 1. Each line joins the block covering most of it; lines without one
///    become scattered blocks when the mask confirms text there
/// 2. Blocks without lines use their own box as a line when the mask agrees
/// 3. Japanese or vertical blocks are split at wide line gaps
/// 4. Scattered lines are merged and everything is sorted for reading
pub fn group_blocks(
    detected: &[DetectedBlock],
    lines: &[TextLine],
    im_w: u32,
    im_h: u32,
    mask: Option<&GrayImage>,
) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = detected
        .iter()
        .map(|d| {
            TextBlock::new(
                d.xyxy,
                Vec::new(),
                Language::from_class(d.class_id),
                d.confidence,
            )
        })
        .collect();
    let mut scattered = Vec::new();

    // 1. Assign lines
    for line in lines {
        let bounds = quad_bounds(&line.quad);
        let line_area = (bounds[2] - bounds[0]) * (bounds[3] - bounds[1]);
        if line_area <= 0.0 {
            continue;
        }

        let best = blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| {
                let score = intersection_area(block.xyxy.map(|v| v as f32), bounds)
                    .map(|a| a / line_area)
                    .unwrap_or(-1.0);
                (idx, score)
            })
            .fold(None, |best: Option<(usize, f32)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            });

        match best {
            Some((idx, score)) if score > LINE_ASSIGN_THRESHOLD => {
                blocks[idx].lines.push(line.quad);
            }
            _ => {
                let xyxy = bounds_i32(bounds);
                if !has_enough_mask(mask, xyxy) {
                    continue;
                }
                let mut block =
                    TextBlock::new(xyxy, vec![line.quad], Language::Unknown, line.score);
                block.examine(im_w, im_h, false);
                scattered.push(block);
            }
        }
    }

    // 2-3. Examine and split detector blocks
    let mut result = Vec::new();
    for mut block in blocks {
        if block.lines.is_empty() {
            if !has_enough_mask(mask, block.xyxy) {
                continue;
            }
            block.lines = vec![xyxy_to_quad(block.xyxy.map(|v| v as f32))];
        }
        block.examine(im_w, im_h, true);

        if block.lines.len() > 1 && (block.language == Language::Ja || block.vertical) {
            result.extend(block.split(im_w, im_h));
        } else {
            result.push(block);
        }
    }

    // 4. Merge scattered lines per orientation, then sort
    let (vertical, horizontal): (Vec<_>, Vec<_>) = scattered.into_iter().partition(|b| b.vertical);
    result.extend(merge_scattered(vertical, im_w, im_h));
    result.extend(merge_scattered(horizontal, im_w, im_h));

    sort_reading_order(&mut result, im_w, im_h);
    result
}

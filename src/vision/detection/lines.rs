// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text line polygons from the detector's shrink map

use geo::{
    point, Area, BoundingRect, Coord, EuclideanLength, HasDimensions, Intersects, LineString,
    MinimumRotatedRect, Polygon,
};
use geo_clipper::{Clipper, EndType, JoinType};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use ndarray::ArrayView2;
use tracing::{debug, instrument};

use crate::vision::geometry::{clip_quad, order_quad, Quad};

/// Probability above which a pixel belongs to a line
pub const BINARY_THRESHOLD: f32 = 0.3;

/// Minimum mean probability inside a line rectangle
pub const BOX_THRESHOLD: f32 = 0.6;

/// Expansion applied to shrunk line rectangles
pub const UNCLIP_RATIO: f32 = 1.5;

/// Maximum number of contours examined per page
pub const MAX_CANDIDATES: usize = 1000;

/// Rectangles with a shorter side below this are noise
const MIN_SIZE: f32 = 3.0;

/// A detected text line in page coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub quad: Quad,
    pub score: f32,
}

fn to_geo_poly(points: &[Point<i32>]) -> Polygon<f32> {
    let coords = points
        .iter()
        .map(|p| Coord {
            x: p.x as f32,
            y: p.y as f32,
        })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

fn min_side(rect: &Polygon<f32>) -> f32 {
    rect.exterior()
        .lines()
        .map(|line| line.euclidean_length())
        .fold(f32::MAX, f32::min)
}

/// Mean prediction over the pixels covered by the rectangle
fn box_score(rect: &Polygon<f32>, pred: &ArrayView2<f32>) -> f32 {
    let Some(bounds) = rect.bounding_rect() else {
        return 0.0;
    };
    let (height, width) = pred.dim();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let x0 = (bounds.min().x.floor().max(0.0) as usize).min(width - 1);
    let x1 = (bounds.max().x.ceil().max(0.0) as usize).min(width - 1);
    let y0 = (bounds.min().y.floor().max(0.0) as usize).min(height - 1);
    let y1 = (bounds.max().y.ceil().max(0.0) as usize).min(height - 1);

    let mut sum = 0.0;
    let mut count = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            if rect.intersects(&point! { x: x as f32, y: y as f32 }) {
                sum += pred[[y, x]];
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Grow a shrunk rectangle back to the full line extent
fn unclip(rect: &Polygon<f32>, ratio: f32) -> Option<Polygon<f32>> {
    let perimeter = rect.exterior().euclidean_length();
    if perimeter <= 0.0 {
        return None;
    }
    let distance = rect.unsigned_area() * ratio / perimeter;

    let expanded = rect.offset(distance, JoinType::Round(0.25), EndType::ClosedPolygon, 1.0);
    if expanded.is_empty() {
        None
    } else {
        expanded.minimum_rotated_rect()
    }
}

fn rect_corners(rect: &Polygon<f32>) -> Option<[[f32; 2]; 4]> {
    let coords: Vec<Coord<f32>> = rect.exterior().coords().copied().collect();
    if coords.len() < 4 {
        return None;
    }
    Some([
        [coords[0].x, coords[0].y],
        [coords[1].x, coords[1].y],
        [coords[2].x, coords[2].y],
        [coords[3].x, coords[3].y],
    ])
}

/// Border of zeros around the bitmap so lines touching the page edge
/// still trace as outer contours
const BITMAP_PADDING: u32 = 1;

fn binarize(pred: &ArrayView2<f32>, threshold: f32) -> GrayImage {
    let (height, width) = pred.dim();
    let pad = BITMAP_PADDING;
    GrayImage::from_fn(width as u32 + 2 * pad, height as u32 + 2 * pad, |x, y| {
        if x < pad || y < pad || x >= width as u32 + pad || y >= height as u32 + pad {
            return Luma([0]);
        }
        if pred[[(y - pad) as usize, (x - pad) as usize]] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Outer contours of the padded bitmap in map coordinates
fn outer_contours(bitmap: &GrayImage) -> Vec<Vec<Point<i32>>> {
    let pad = BITMAP_PADDING as i32;
    find_contours::<i32>(bitmap)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .take(MAX_CANDIDATES)
        .map(|contour| {
            contour
                .points
                .into_iter()
                .map(|p| Point::new(p.x - pad, p.y - pad))
                .collect()
        })
        .collect()
}

/// Extract line quads from a shrink probability map
///
/// `pred` covers the unpadded page region of the detector input; quads are
/// scaled to `dest_width` x `dest_height`.
#[instrument(skip(pred), level = "debug")]
pub fn extract_lines(pred: ArrayView2<f32>, dest_width: u32, dest_height: u32) -> Vec<TextLine> {
    let (height, width) = pred.dim();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let bitmap = binarize(&pred, BINARY_THRESHOLD);
    let scale_x = dest_width as f32 / width as f32;
    let scale_y = dest_height as f32 / height as f32;

    let lines: Vec<TextLine> = outer_contours(&bitmap)
        .into_iter()
        .filter(|points| points.len() > 2)
        .filter_map(|points| to_geo_poly(&points).minimum_rotated_rect())
        .filter(|rect| min_side(rect) >= MIN_SIZE)
        .map(|rect| {
            let score = box_score(&rect, &pred);
            (rect, score)
        })
        .filter(|(_, score)| *score >= BOX_THRESHOLD)
        .filter_map(|(rect, score)| Some((unclip(&rect, UNCLIP_RATIO)?, score)))
        .filter(|(rect, _)| min_side(rect) >= MIN_SIZE + 2.0)
        .filter_map(|(rect, score)| {
            let corners = rect_corners(&rect)?;
            let scaled = order_quad(corners)
                .map(|[x, y]| [(x * scale_x).round(), (y * scale_y).round()]);
            Some(TextLine {
                quad: clip_quad(scaled, dest_width as f32, dest_height as f32),
                score,
            })
        })
        .collect();

    debug!("Extracted {} text lines", lines.len());
    lines
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Quadrilateral and bounding box helpers shared by detection, cropping and drawing

/// Four points ordered top-left, top-right, bottom-right, bottom-left
pub type Quad = [[f32; 2]; 4];

/// Axis-aligned bounds of a quad as `[x1, y1, x2, y2]`
pub fn quad_bounds(quad: &Quad) -> [f32; 4] {
    let mut bounds = [f32::MAX, f32::MAX, f32::MIN, f32::MIN];
    for [x, y] in quad {
        bounds[0] = bounds[0].min(*x);
        bounds[1] = bounds[1].min(*y);
        bounds[2] = bounds[2].max(*x);
        bounds[3] = bounds[3].max(*y);
    }
    bounds
}

/// Tight bounding box enclosing every point of every line polygon
///
/// Falls back to the detector box when there are no lines. Coordinates are
/// truncated toward zero.
pub fn tight_bbox(lines: &[Quad], fallback: [i32; 4]) -> [i32; 4] {
    if lines.is_empty() {
        return fallback;
    }

    let mut bounds = [f32::MAX, f32::MAX, f32::MIN, f32::MIN];
    for line in lines {
        let [x1, y1, x2, y2] = quad_bounds(line);
        bounds[0] = bounds[0].min(x1);
        bounds[1] = bounds[1].min(y1);
        bounds[2] = bounds[2].max(x2);
        bounds[3] = bounds[3].max(y2);
    }

    [
        bounds[0] as i32,
        bounds[1] as i32,
        bounds[2] as i32,
        bounds[3] as i32,
    ]
}

/// Area of the overlap of two `[x1, y1, x2, y2]` boxes, `None` when disjoint
pub fn intersection_area(a: [f32; 4], b: [f32; 4]) -> Option<f32> {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);
    if x2 < x1 || y2 < y1 {
        return None;
    }
    Some((x2 - x1) * (y2 - y1))
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
pub fn iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    let inter = intersection_area(a, b).unwrap_or(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Rectangle as a quad
pub fn xyxy_to_quad(xyxy: [f32; 4]) -> Quad {
    let [x1, y1, x2, y2] = xyxy;
    [[x1, y1], [x2, y1], [x2, y2], [x1, y2]]
}

/// Order four rectangle corners as top-left, top-right, bottom-right, bottom-left
///
/// Points are split into a left and right pair by x, then each pair by y.
pub fn order_quad(mut points: [[f32; 2]; 4]) -> Quad {
    points.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));

    let (top_left, bottom_left) = if points[1][1] > points[0][1] {
        (points[0], points[1])
    } else {
        (points[1], points[0])
    };
    let (top_right, bottom_right) = if points[3][1] > points[2][1] {
        (points[2], points[3])
    } else {
        (points[3], points[2])
    };

    [top_left, top_right, bottom_right, bottom_left]
}

/// Midpoints of the four edges, index `i` sits between corner `i` and `i + 1`
pub fn edge_midpoints(quad: &Quad) -> [[f32; 2]; 4] {
    let mut mid = [[0.0; 2]; 4];
    for i in 0..4 {
        let next = quad[(i + 1) % 4];
        mid[i] = [(quad[i][0] + next[0]) / 2.0, (quad[i][1] + next[1]) / 2.0];
    }
    mid
}

/// Vertical and horizontal mid-edge vectors of a line quad
///
/// The vertical vector runs from the top edge midpoint to the bottom edge
/// midpoint, the horizontal one from the left edge midpoint to the right.
pub fn line_vectors(quad: &Quad) -> ([f32; 2], [f32; 2]) {
    let mid = edge_midpoints(quad);
    let vec_v = [mid[2][0] - mid[0][0], mid[2][1] - mid[0][1]];
    let vec_h = [mid[1][0] - mid[3][0], mid[1][1] - mid[3][1]];
    (vec_v, vec_h)
}

/// Euclidean norm of a 2D vector
pub fn norm(v: [f32; 2]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// Clamp every point of a quad into `[0, width] x [0, height]`
pub fn clip_quad(quad: Quad, width: f32, height: f32) -> Quad {
    quad.map(|[x, y]| [x.clamp(0.0, width), y.clamp(0.0, height)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tight_bbox_from_lines() {
        let lines = vec![
            [[10.5, 20.0], [30.0, 20.0], [30.0, 80.9], [10.5, 80.9]],
            [[40.0, 15.2], [55.7, 15.2], [55.7, 70.0], [40.0, 70.0]],
        ];
        assert_eq!(tight_bbox(&lines, [0, 0, 100, 100]), [10, 15, 55, 80]);
    }

    #[test]
    fn test_tight_bbox_rotated_line() {
        let lines = vec![[[12.0, 5.0], [40.0, 9.0], [38.0, 30.0], [10.0, 26.0]]];
        assert_eq!(tight_bbox(&lines, [0, 0, 0, 0]), [10, 5, 40, 30]);
    }

    #[test]
    fn test_tight_bbox_fallback_without_lines() {
        assert_eq!(tight_bbox(&[], [1, 2, 3, 4]), [1, 2, 3, 4]);
    }

    #[test]
    fn test_intersection_area() {
        assert_eq!(
            intersection_area([0.0, 0.0, 10.0, 10.0], [5.0, 5.0, 15.0, 15.0]),
            Some(25.0)
        );
        assert_eq!(
            intersection_area([0.0, 0.0, 10.0, 10.0], [20.0, 20.0, 30.0, 30.0]),
            None
        );
        // Touching edges overlap with zero area
        assert_eq!(
            intersection_area([0.0, 0.0, 10.0, 10.0], [10.0, 0.0, 20.0, 10.0]),
            Some(0.0)
        );
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(a, a) - 1.0).abs() < 1e-6);
        assert!((iou(a, [5.0, 0.0, 15.0, 10.0]) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(iou(a, [20.0, 20.0, 30.0, 30.0]), 0.0);
    }

    #[test]
    fn test_order_quad() {
        let shuffled = [[30.0, 40.0], [10.0, 10.0], [30.0, 10.0], [10.0, 40.0]];
        assert_eq!(
            order_quad(shuffled),
            [[10.0, 10.0], [30.0, 10.0], [30.0, 40.0], [10.0, 40.0]]
        );
    }

    #[test]
    fn test_line_vectors() {
        let quad = xyxy_to_quad([0.0, 0.0, 100.0, 20.0]);
        let (v, h) = line_vectors(&quad);
        assert_eq!(v, [0.0, 20.0]);
        assert_eq!(h, [100.0, 0.0]);
        assert_eq!(norm(h), 100.0);
    }

    #[test]
    fn test_clip_quad() {
        let quad = [[-5.0, -1.0], [120.0, 0.0], [120.0, 60.0], [-5.0, 60.0]];
        assert_eq!(
            clip_quad(quad, 100.0, 50.0),
            [[0.0, 0.0], [100.0, 0.0], [100.0, 50.0], [0.0, 50.0]]
        );
    }
}

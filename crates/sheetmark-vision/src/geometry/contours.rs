// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary contour detection and rectangular-candidate filtering.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::arc_length;
use imageproc::point::Point;
use sheetmark_core::config::BoundaryConfig;
use tracing::debug;

/// A closed boundary traced in a binary image.
pub type Contour = Vec<Point<i32>>;

/// A contour that passed the rectangularity filter.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadCandidate {
    /// Position of the contour in traversal order.
    pub index: usize,
    /// Enclosed area in square pixels.
    pub area: f64,
    /// The four vertices of the polygonal approximation, as traced.
    pub vertices: [Point<i32>; 4],
}

/// Trace the outermost boundaries of the foreground (non-zero) regions.
///
/// Holes and boundaries nested inside other regions are dropped. Order is
/// the raster-scan order in which borders are first met.
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    let contours: Vec<Contour> = find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .map(|contour| contour.points)
        .collect();
    debug!(count = contours.len(), "External contours traced");
    contours
}

/// Filter contours down to the ones that look like quadrilaterals.
///
/// A contour qualifies when its area is strictly greater than
/// `min_contour_area` and its closed polygonal approximation, with tolerance
/// `approx_epsilon_ratio * perimeter`, has exactly four vertices. Candidates
/// keep the order of `contours`.
pub fn quad_candidates(contours: &[Contour], config: &BoundaryConfig) -> Vec<QuadCandidate> {
    contours
        .iter()
        .enumerate()
        .filter_map(|(index, contour)| {
            let area = contour_area(contour);
            if area <= config.min_contour_area {
                return None;
            }
            let epsilon = config.approx_epsilon_ratio * arc_length(contour, true);
            let approx = approximate_closed_polygon(contour, epsilon);
            let vertices: [Point<i32>; 4] = approx.try_into().ok()?;
            Some(QuadCandidate {
                index,
                area,
                vertices,
            })
        })
        .collect()
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as i64 * points[j].y as i64;
        twice_area -= points[j].x as i64 * points[i].y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

/// Douglas-Peucker simplification of a closed curve.
///
/// The curve is cut at its first point and the point farthest from it, and
/// each half is simplified as an open polyline. The result lists each kept
/// vertex once (the first point is not repeated at the end).
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let origin = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let dx = (p.x - origin.x) as i64;
            let dy = (p.y - origin.y) as i64;
            dx * dx + dy * dy
        })
        .map_or(0, |(i, _)| i);
    if far == 0 {
        return vec![origin];
    }

    let first = simplify_open(&points[..=far], epsilon);
    let mut return_path = points[far..].to_vec();
    return_path.push(origin);
    let second = simplify_open(&return_path, epsilon);

    let mut polygon = first;
    // `second` starts at the far point and ends at the origin; both are
    // already in `first`.
    if second.len() > 2 {
        polygon.extend_from_slice(&second[1..second.len() - 1]);
    }
    polygon
}

/// Iterative Douglas-Peucker on an open polyline. Both endpoints are kept.
fn simplify_open(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = distance_to_line(points[i], points[start], points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }
        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Perpendicular distance from `p` to the line through `a` and `b`, or the
/// distance to `a` when the two coincide.
fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return (px - ax).hypot(py - ay);
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / length
}

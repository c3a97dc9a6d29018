// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner canonicalisation for detected sheet boundaries.

use imageproc::point::Point;
use sheetmark_core::error::{Result, SheetmarkError};

/// A corner position in image coordinates.
pub type Corner = (f32, f32);

/// Four sheet corners in canonical order.
///
/// Only constructible from a non-degenerate convex quadrilateral, so every
/// `CornerSet` is safe to feed into a perspective transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSet {
    pub top_left: Corner,
    pub top_right: Corner,
    pub bottom_left: Corner,
    pub bottom_right: Corner,
}

impl CornerSet {
    /// Canonicalise four corners given in any order.
    ///
    /// The smallest `x + y` is top-left and the largest is bottom-right; the
    /// smallest `y - x` is top-right and the largest is bottom-left. Ties go
    /// to the earliest point. Fails when those picks do not name four
    /// distinct points or the resulting quadrilateral is not strictly convex.
    pub fn from_unordered(points: [Corner; 4]) -> Result<Self> {
        let [tl, tr, bl, br] = canonical_order(&points);

        let mut seen = [false; 4];
        for index in [tl, tr, bl, br] {
            if seen[index] {
                return Err(SheetmarkError::DegenerateCorners(format!(
                    "corner ordering is ambiguous for {points:?}"
                )));
            }
            seen[index] = true;
        }

        let corners = Self {
            top_left: points[tl],
            top_right: points[tr],
            bottom_left: points[bl],
            bottom_right: points[br],
        };
        if !corners.is_convex() {
            return Err(SheetmarkError::DegenerateCorners(format!(
                "corners do not form a convex quadrilateral: {corners:?}"
            )));
        }
        Ok(corners)
    }

    /// Canonicalise integer contour vertices.
    pub fn from_vertices(vertices: &[Point<i32>; 4]) -> Result<Self> {
        Self::from_unordered(vertices.map(|p| (p.x as f32, p.y as f32)))
    }

    /// Corners as `[top_left, top_right, bottom_left, bottom_right]`.
    pub fn to_array(&self) -> [Corner; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Corners walking the boundary: TL, TR, BR, BL.
    fn perimeter_order(&self) -> [Corner; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Enclosed area (shoelace).
    pub fn area(&self) -> f32 {
        let ring = self.perimeter_order();
        let mut twice_area = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice_area += ring[i].0 * ring[j].1 - ring[j].0 * ring[i].1;
        }
        twice_area.abs() / 2.0
    }

    fn is_convex(&self) -> bool {
        let ring = self.perimeter_order();
        let mut sign = 0.0f32;
        for i in 0..4 {
            let a = ring[i];
            let b = ring[(i + 1) % 4];
            let c = ring[(i + 2) % 4];
            let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
            if cross == 0.0 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

/// Indices of `[top_left, top_right, bottom_left, bottom_right]` in `points`.
///
/// Pure sum/difference rule with first-occurrence tie breaking; performs no
/// validation.
pub fn canonical_order(points: &[Corner; 4]) -> [usize; 4] {
    let sum = |p: &Corner| p.0 + p.1;
    let diff = |p: &Corner| p.1 - p.0;
    [
        arg_extreme(points, sum, |a, b| a < b),
        arg_extreme(points, diff, |a, b| a < b),
        arg_extreme(points, diff, |a, b| a > b),
        arg_extreme(points, sum, |a, b| a > b),
    ]
}

/// Index of the first point whose key beats every earlier key.
fn arg_extreme(
    points: &[Corner; 4],
    key: impl Fn(&Corner) -> f32,
    better: impl Fn(f32, f32) -> bool,
) -> usize {
    let mut best = 0;
    let mut best_key = key(&points[0]);
    for (i, point) in points.iter().enumerate().skip(1) {
        let k = key(point);
        if better(k, best_key) {
            best = i;
            best_key = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const TL: Corner = (0.0, 0.0);
    const TR: Corner = (100.0, 0.0);
    const BL: Corner = (0.0, 100.0);
    const BR: Corner = (100.0, 100.0);

    /// All 24 orderings of four items.
    fn permutations(items: [Corner; 4]) -> Vec<[Corner; 4]> {
        let mut out = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        idx.iter().for_each(|&i| seen[i] = true);
                        if seen.iter().all(|&s| s) {
                            out.push(idx.map(|i| items[i]));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn square_canonicalises_from_every_ordering() {
        let orderings = permutations([TL, TR, BL, BR]);
        assert_eq!(orderings.len(), 24);
        for points in orderings {
            let corners = CornerSet::from_unordered(points).expect("valid square");
            assert_eq!(corners.top_left, TL, "input {points:?}");
            assert_eq!(corners.top_right, TR, "input {points:?}");
            assert_eq!(corners.bottom_left, BL, "input {points:?}");
            assert_eq!(corners.bottom_right, BR, "input {points:?}");
        }
    }

    #[test]
    fn reorder_is_idempotent() {
        let points = [(312.0, 48.0), (20.0, 35.0), (330.0, 460.0), (12.0, 470.0)];
        let once = CornerSet::from_unordered(points).expect("valid quad");
        let twice = CornerSet::from_unordered(once.to_array()).expect("still valid");
        assert_eq!(once, twice);
        assert_eq!(canonical_order(&once.to_array()), [0, 1, 2, 3]);
    }

    #[test]
    fn perspective_skewed_quad() {
        let points = [(40.0, 30.0), (700.0, 60.0), (20.0, 950.0), (730.0, 900.0)];
        let corners = CornerSet::from_unordered([points[3], points[1], points[0], points[2]])
            .expect("valid quad");
        assert_eq!(corners.to_array(), points);
        assert!(corners.area() > 0.0);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let points = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)];
        assert!(matches!(
            CornerSet::from_unordered(points),
            Err(SheetmarkError::DegenerateCorners(_))
        ));
    }

    #[test]
    fn diamond_with_ambiguous_ordering_is_rejected() {
        // A square rotated 45 degrees: the top vertex minimises both the sum
        // and the difference on ties, so two roles collapse onto one point.
        let points = [(50.0, 0.0), (100.0, 50.0), (50.0, 100.0), (0.0, 50.0)];
        assert!(CornerSet::from_unordered(points).is_err());
    }

    #[test]
    fn non_convex_quad_is_rejected() {
        // Arrow-head: bottom-right pushed inside the triangle of the others.
        let points = [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (30.0, 30.0)];
        assert!(CornerSet::from_unordered(points).is_err());
    }

    #[test]
    fn from_vertices_converts_integer_points() {
        let vertices = [
            Point::new(100, 100),
            Point::new(0, 0),
            Point::new(0, 100),
            Point::new(100, 0),
        ];
        let corners = CornerSet::from_vertices(&vertices).expect("valid");
        assert_eq!(corners.to_array(), [TL, TR, BL, BR]);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry — boundary contours, corner canonicalisation, and perspective
// rectification of the answer sheet.

pub mod contours;
pub mod corners;
pub mod normalize;

pub use corners::CornerSet;
pub use normalize::{BoundaryDetection, Normalized, Normalizer};

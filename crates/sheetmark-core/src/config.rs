// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every numeric knob of the OMR pipeline lives here;
// the defaults reproduce the answer-sheet layout the tool was calibrated on
// (750x980 canonical sheet, 93 questions in 3 columns of 31, choices A-E).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SheetmarkError};

/// Largest supported choice count (one uppercase letter per choice).
pub const MAX_CHOICES: usize = 26;

/// Complete configuration for reading one kind of answer sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmrConfig {
    /// Width of the canonical (rectified) sheet in pixels.
    pub target_width: u32,
    /// Height of the canonical (rectified) sheet in pixels.
    pub target_height: u32,
    /// Number of question rows in the fill matrix.
    pub question_count: usize,
    /// Number of choices per question.
    pub choice_count: usize,
    pub preprocess: PreprocessConfig,
    pub boundary: BoundaryConfig,
    pub grid: GridGeometry,
    pub thresholds: ResolverThresholds,
}

impl Default for OmrConfig {
    fn default() -> Self {
        Self {
            target_width: 750,
            target_height: 980,
            question_count: 93,
            choice_count: 5,
            preprocess: PreprocessConfig::default(),
            boundary: BoundaryConfig::default(),
            grid: GridGeometry::default(),
            thresholds: ResolverThresholds::default(),
        }
    }
}

/// Binarisation settings applied before boundary detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gray levels above this value are paper; at or below are ink.
    pub binary_threshold: u8,
    /// Median filter radius used to knock out specks. 0 disables denoising.
    pub denoise_radius: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 170,
            denoise_radius: 1,
        }
    }
}

/// Rules deciding which contour counts as the sheet boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Contours enclosing this many square pixels or fewer are noise.
    pub min_contour_area: f64,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            min_contour_area: 1000.0,
            approx_epsilon_ratio: 0.01,
        }
    }
}

/// Slicing parameters of the bubble grid on the canonical sheet.
///
/// The sheet is cropped by the margins, split into `column_count` vertical
/// strips, each strip into `rows_per_column` bands, and each band (after
/// cropping to `horizontal_window`) into `choice_count` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGeometry {
    /// Pixel rows dropped from the top edge (header area).
    pub top_margin: u32,
    /// Pixel rows dropped from the bottom edge.
    pub bottom_margin: u32,
    /// Major vertical divisions of the sheet.
    pub column_count: usize,
    /// Question rows per major column.
    pub rows_per_column: usize,
    /// `[start, end)` pixel offsets of the bubble band within a strip.
    /// Clamped to the strip width when applied.
    pub horizontal_window: [u32; 2],
    /// Pixel rows trimmed from the top and bottom of every band.
    pub vertical_inset: u32,
    /// Cells per band.
    pub choice_count: usize,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            top_margin: 40,
            bottom_margin: 10,
            column_count: 3,
            rows_per_column: 31,
            horizontal_window: [70, 220],
            vertical_inset: 0,
            choice_count: 5,
        }
    }
}

impl GridGeometry {
    /// Total number of question slots the grid emits.
    pub fn slot_count(&self) -> usize {
        self.column_count * self.rows_per_column
    }

    /// Total number of cells the grid emits.
    pub fn cell_count(&self) -> usize {
        self.slot_count() * self.choice_count
    }
}

/// Absolute fill thresholds used by the answer resolver.
///
/// Both values are pixel counts and only make sense for the configured
/// canonical size and grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverThresholds {
    /// Rows whose total fill is below this are treated as non-existent.
    pub low_activity: f32,
    /// The top choice must exceed this to count as marked.
    pub mark: f32,
}

impl Default for ResolverThresholds {
    fn default() -> Self {
        Self {
            low_activity: 100.0,
            mark: 400.0,
        }
    }
}

impl OmrConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "configuration loaded");
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(SheetmarkError::InvalidConfig(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.question_count == 0 {
            return Err(SheetmarkError::InvalidConfig(
                "question_count must be at least 1".into(),
            ));
        }
        if self.choice_count == 0 || self.choice_count > MAX_CHOICES {
            return Err(SheetmarkError::InvalidConfig(format!(
                "choice_count must be in 1..={MAX_CHOICES}, got {}",
                self.choice_count
            )));
        }
        if self.grid.choice_count != self.choice_count {
            return Err(SheetmarkError::InvalidConfig(format!(
                "grid.choice_count ({}) differs from choice_count ({})",
                self.grid.choice_count, self.choice_count
            )));
        }
        if self.grid.column_count == 0 || self.grid.rows_per_column == 0 {
            return Err(SheetmarkError::InvalidConfig(format!(
                "grid must have at least one column and row, got {}x{}",
                self.grid.column_count, self.grid.rows_per_column
            )));
        }
        if self.grid.slot_count() > self.question_count {
            return Err(SheetmarkError::InvalidConfig(format!(
                "grid has {} question slots but question_count is {}",
                self.grid.slot_count(),
                self.question_count
            )));
        }
        let [start, end] = self.grid.horizontal_window;
        if start >= end {
            return Err(SheetmarkError::InvalidConfig(format!(
                "horizontal_window start ({start}) must be before end ({end})"
            )));
        }
        let ratio = self.boundary.approx_epsilon_ratio;
        if ratio.is_nan() || ratio <= 0.0 {
            return Err(SheetmarkError::InvalidConfig(format!(
                "approx_epsilon_ratio must be positive, got {ratio}"
            )));
        }
        let area = self.boundary.min_contour_area;
        if !area.is_finite() || area < 0.0 {
            return Err(SheetmarkError::InvalidConfig(format!(
                "min_contour_area must be a non-negative number, got {area}"
            )));
        }
        let ResolverThresholds { low_activity, mark } = self.thresholds;
        if !(low_activity.is_finite() && mark.is_finite()) || low_activity < 0.0 || mark < 0.0 {
            return Err(SheetmarkError::InvalidConfig(format!(
                "resolver thresholds must be non-negative numbers, got low_activity={low_activity} mark={mark}"
            )));
        }
        if low_activity > mark {
            return Err(SheetmarkError::InvalidConfig(format!(
                "low_activity ({low_activity}) must not exceed mark ({mark})"
            )));
        }
        Ok(())
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet reader — the single-sheet pipeline: preprocess, normalize, segment,
// score, resolve.

use image::{DynamicImage, GrayImage, RgbImage};
use sheetmark_core::config::OmrConfig;
use sheetmark_core::error::Result;
use sheetmark_core::types::{AnswerMap, FillVector};
use tracing::{info, instrument};

use crate::annotate::annotate;
use crate::geometry::{BoundaryDetection, Normalizer};
use crate::grid::{ActiveRow, CellPlacement, resolve, score, segment};
use crate::prep::preprocess;

/// Everything produced while reading one sheet.
#[derive(Debug, Clone)]
pub struct SheetReading {
    /// Resolved answers, keyed from 1.
    pub answers: AnswerMap,
    /// Raw fill scores, one row per question slot.
    pub fill: FillVector,
    /// Rows that passed the low-activity filter, in answer-key order.
    pub active_rows: Vec<ActiveRow>,
    /// Cell rectangles used for scoring.
    pub layout: Vec<CellPlacement>,
    /// Binary canonical image the grid was cut from.
    pub normalized: GrayImage,
    pub boundary: BoundaryDetection,
}

impl SheetReading {
    /// Audit image: the normalized sheet with grid and decisions drawn on it.
    pub fn annotated(&self) -> RgbImage {
        annotate(self)
    }
}

/// Reads answer sheets with a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct SheetReader {
    config: OmrConfig,
    normalizer: Normalizer,
}

impl SheetReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader, rejecting invalid configuration up front.
    pub fn new(config: OmrConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = Normalizer::new(config.boundary.clone());
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &OmrConfig {
        &self.config
    }

    // -- Pipeline -------------------------------------------------------------

    /// Read one decoded 3-channel sheet image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn read(&self, image: &DynamicImage) -> Result<SheetReading> {
        let config = &self.config;
        let (width, height) = (config.target_width, config.target_height);

        let binary = preprocess(image, &config.preprocess, width, height)?;
        let normalized = self.normalizer.normalize(&binary, width, height)?;

        let cells = segment(&normalized.image, &config.grid);
        let layout: Vec<CellPlacement> = cells.iter().map(|cell| cell.placement).collect();
        let fill = score(&cells, config.question_count, config.choice_count)?;

        let active_rows = resolve::active_rows(
            &fill,
            config.question_count,
            config.thresholds.low_activity,
        );
        let answers = resolve::renumber(&active_rows, config.thresholds.mark);
        info!(
            boundary_found = normalized.boundary.is_found(),
            questions = answers.len(),
            marked = answers.marked_count(),
            "Sheet read"
        );

        Ok(SheetReading {
            answers,
            fill,
            active_rows,
            layout,
            normalized: normalized.image,
            boundary: normalized.boundary,
        })
    }

    /// Convenience wrapper returning only the answers.
    pub fn read_answers(&self, image: &DynamicImage) -> Result<AnswerMap> {
        Ok(self.read(image)?.answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use sheetmark_core::error::SheetmarkError;

    fn white(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = OmrConfig {
            question_count: 0,
            ..OmrConfig::default()
        };
        assert!(matches!(
            SheetReader::new(config),
            Err(SheetmarkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn blank_sheet_yields_no_answers() {
        let reader = SheetReader::new(OmrConfig::default()).expect("reader");
        let reading = reader.read(&white(600, 800)).expect("read");
        assert!(reading.answers.is_empty());
        assert_eq!(reading.boundary, BoundaryDetection::NotFound);
        assert_eq!(reading.normalized.dimensions(), (750, 980));
        assert_eq!(reading.layout.len(), 465);
        assert_eq!(reading.fill.rows(), 93);
    }

    #[test]
    fn grayscale_input_is_malformed() {
        let reader = SheetReader::new(OmrConfig::default()).expect("reader");
        let gray = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        assert!(matches!(
            reader.read(&gray),
            Err(SheetmarkError::MalformedInput(_))
        ));
    }

    #[test]
    fn ink_in_a_cell_is_read_as_a_mark() {
        // Canonical-size input needs no resize; without a frame the image
        // passes through unrectified, so cell coordinates are exact.
        let mut img = RgbImage::from_pixel(750, 980, Rgb([255, 255, 255]));
        // Question 1, choice C: x 130..160, y 40..70.
        for y in 42..68 {
            for x in 132..158 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let reader = SheetReader::new(OmrConfig::default()).expect("reader");
        let reading = reader.read(&DynamicImage::ImageRgb8(img)).expect("read");
        assert_eq!(reading.answers.len(), 1);
        assert_eq!(
            reading.answers.get(1),
            Some(sheetmark_core::types::Answer::Choice('C'))
        );
        assert!(reading.annotated().dimensions() == (750, 980));
    }

    #[test]
    fn reader_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SheetReader>();
    }
}

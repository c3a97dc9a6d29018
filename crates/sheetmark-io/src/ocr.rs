// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR sheet identification.
//
// Reads the printed `ID: <label>` line from the original (unrectified) sheet
// image using the `ocrs` crate, a pure-Rust OCR engine whose neural network
// models run on `rten`.
//
// # Feature Gate
//
// Only compiled with the `ocr` feature:
//
// ```toml
// sheetmark-io = { path = "crates/sheetmark-io", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine needs two model files in one directory:
//
// - `text-detection.rten` locates text regions.
// - `text-recognition.rten` decodes characters from those regions.
//
// Running `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is the default directory used here.
// Release builds are strongly recommended; debug builds of `rten` are very
// slow.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use sheetmark_core::error::{Result, SheetmarkError};
use sheetmark_core::types::SheetId;
use tracing::{debug, info, instrument, warn};

use crate::identify::{SheetIdentifier, parse_sheet_id};
use crate::source::SheetEntry;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`, else `./ocrs-models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where the OCR models live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Expect `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Both model files must exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(SheetmarkError::Ocr(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    kind,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Identifies sheets by the `ID:` label printed on them.
pub struct OcrIdentifier {
    engine: OcrEngine,
}

impl OcrIdentifier {
    /// Load both models. This is the expensive step; build one identifier
    /// per batch.
    #[instrument(skip_all, fields(
        detection = %models.detection_model_path.display(),
        recognition = %models.recognition_model_path.display(),
    ))]
    pub fn new(models: OcrModels) -> Result<Self> {
        models.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&models.detection_model_path).map_err(|err| {
            SheetmarkError::Ocr(format!(
                "failed to load detection model from {}: {}",
                models.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&models.recognition_model_path).map_err(|err| {
                SheetmarkError::Ocr(format!(
                    "failed to load recognition model from {}: {}",
                    models.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| SheetmarkError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    /// Load models from the default cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrModels::default())
    }

    /// All text on the sheet, lines separated by newlines.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            SheetmarkError::Ocr(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| SheetmarkError::Ocr(format!("OCR preprocessing failed: {}", err)))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| SheetmarkError::Ocr(format!("OCR text recognition failed: {}", err)))?;

        debug!(lines = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}

impl SheetIdentifier for OcrIdentifier {
    fn identify(&self, entry: &SheetEntry, image: &DynamicImage) -> SheetId {
        match self.recognize_text(image) {
            Ok(text) => parse_sheet_id(&text).unwrap_or_else(|| {
                debug!(sheet = %entry, "No ID label recognised");
                SheetId::unknown()
            }),
            Err(err) => {
                warn!(sheet = %entry, error = %err, "OCR failed; filing under unknown ID");
                SheetId::unknown()
            }
        }
    }
}

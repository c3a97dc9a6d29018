// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet sources — enumerate and decode the sheets of a batch.

use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use sheetmark_core::error::{Result, SheetmarkError};
use tracing::{debug, instrument};

/// File extensions accepted by [`ImageDirSource`], compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// One sheet in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Output stem, unique within the batch (`scan_01`, `exam_page_3`).
    pub name: String,
    /// File the sheet comes from.
    pub path: PathBuf,
    /// 1-based page number for multi-page documents.
    pub page: Option<u32>,
}

impl SheetEntry {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            page: None,
        }
    }

    pub fn page(name: impl Into<String>, path: impl Into<PathBuf>, page: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            page: Some(page),
        }
    }
}

impl fmt::Display for SheetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Somewhere sheets come from.
pub trait SheetSource {
    /// List the sheets in processing order. Failing here aborts the batch.
    fn entries(&self) -> Result<Vec<SheetEntry>>;

    /// Decode one sheet into a 3-channel image.
    fn load(&self, entry: &SheetEntry) -> Result<DynamicImage>;
}

/// A directory of PNG/JPEG sheet images.
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    dir: PathBuf,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SheetSource for ImageDirSource {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn entries(&self) -> Result<Vec<SheetEntry>> {
        let entries: Vec<SheetEntry> = files_with_extension(&self.dir, IMAGE_EXTENSIONS)?
            .into_iter()
            .map(|path| SheetEntry::file(file_stem(&path), path))
            .collect();
        debug!(count = entries.len(), "Image sheets found");
        Ok(entries)
    }

    fn load(&self, entry: &SheetEntry) -> Result<DynamicImage> {
        let image = image::open(&entry.path).map_err(|err| {
            SheetmarkError::Image(format!("failed to open {}: {}", entry.path.display(), err))
        })?;
        Ok(to_rgb(image))
    }
}

/// Normalise any decoded raster to 8-bit RGB, dropping alpha.
pub fn to_rgb(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Regular files in `dir` whose extension is in `extensions`, sorted by name.
pub(crate) fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

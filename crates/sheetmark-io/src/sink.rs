// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result sinks — persist each sheet's answers and normalized image.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use sheetmark_core::error::{Result, SheetmarkError};
use sheetmark_core::types::SheetId;
use sheetmark_vision::SheetReading;
use tracing::{debug, instrument, warn};

use crate::source::SheetEntry;

/// Where results go.
pub trait ResultSink {
    /// Store one sheet's results, returning the files written.
    fn persist(&self, id: &SheetId, entry: &SheetEntry, reading: &SheetReading)
    -> Result<Vec<PathBuf>>;
}

/// Writes `<root>/<sheet_id>/<entry>.json` and `<entry>.png`.
///
/// With audit output on, also `<entry>_annotated.png` and `<entry>_fill.json`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    audit: bool,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            audit: false,
        }
    }

    pub fn with_audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every sheet filed under `id`.
    ///
    /// An ID that is not a single plain path component (`.`, `..`, anything
    /// with a separator or a root) is filed under [`SheetId::UNKNOWN`].
    pub fn sheet_dir(&self, id: &SheetId) -> PathBuf {
        if is_plain_component(id.as_str()) {
            self.root.join(id.as_str())
        } else {
            warn!(id = %id, "Sheet ID is not a plain directory name; using unknown_id");
            self.root.join(SheetId::UNKNOWN)
        }
    }
}

impl ResultSink for DirectorySink {
    #[instrument(skip(self, reading), fields(sheet = %entry, id = %id))]
    fn persist(
        &self,
        id: &SheetId,
        entry: &SheetEntry,
        reading: &SheetReading,
    ) -> Result<Vec<PathBuf>> {
        let dir = self.sheet_dir(id);
        std::fs::create_dir_all(&dir)?;

        let mut written = Vec::with_capacity(4);

        let answers_path = dir.join(format!("{}.json", entry.name));
        write_json(&answers_path, &reading.answers)?;
        written.push(answers_path);

        let image_path = dir.join(format!("{}.png", entry.name));
        save_png(&reading.normalized, &image_path)?;
        written.push(image_path);

        if self.audit {
            let annotated_path = dir.join(format!("{}_annotated.png", entry.name));
            save_png(&reading.annotated(), &annotated_path)?;
            written.push(annotated_path);

            let fill_path = dir.join(format!("{}_fill.json", entry.name));
            write_json(&fill_path, &reading.fill)?;
            written.push(fill_path);
        }

        debug!(files = written.len(), dir = %dir.display(), "Results written");
        Ok(written)
    }
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Serialize `value` as JSON indented by four spaces.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}

fn save_png<P, C>(image: &image::ImageBuffer<P, C>, path: &Path) -> Result<()>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|err| SheetmarkError::Image(format!("failed to write {}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use sheetmark_core::types::{Answer, AnswerMap, FillVector};
    use sheetmark_vision::BoundaryDetection;

    fn reading() -> SheetReading {
        let answers: AnswerMap = [(1, Answer::Choice('A')), (2, Answer::Unmarked)]
            .into_iter()
            .collect();
        SheetReading {
            answers,
            fill: FillVector::zeros(2, 5),
            active_rows: Vec::new(),
            layout: Vec::new(),
            normalized: GrayImage::from_pixel(30, 40, Luma([255u8])),
            boundary: BoundaryDetection::NotFound,
        }
    }

    #[test]
    fn writes_answers_and_image_under_sheet_id() {
        let root = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(root.path());
        let entry = SheetEntry::file("scan_01", "/in/scan_01.png");

        let written = sink
            .persist(&SheetId::unknown(), &entry, &reading())
            .expect("persist");
        assert_eq!(written.len(), 2);

        let dir = root.path().join("unknown_id");
        let json = std::fs::read_to_string(dir.join("scan_01.json")).expect("json");
        assert_eq!(json, "{\n    \"1\": \"A\",\n    \"2\": \"None\"\n}");

        let png = image::open(dir.join("scan_01.png")).expect("png");
        assert_eq!((png.width(), png.height()), (30, 40));
    }

    #[test]
    fn audit_output_adds_annotated_image_and_fill() {
        let root = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(root.path()).with_audit(true);
        let entry = SheetEntry::page("exam_page_2", "/in/exam.pdf", 2);

        let written = sink
            .persist(&SheetId::new("S42"), &entry, &reading())
            .expect("persist");
        assert_eq!(written.len(), 4);

        let dir = root.path().join("S42");
        assert!(dir.join("exam_page_2_annotated.png").is_file());
        let fill: Vec<Vec<f32>> = serde_json::from_str(
            &std::fs::read_to_string(dir.join("exam_page_2_fill.json")).expect("fill"),
        )
        .expect("parse fill");
        assert_eq!(fill.len(), 2);
        assert_eq!(fill[0].len(), 5);
    }

    #[test]
    fn path_like_ids_stay_inside_the_root() {
        let parent = tempfile::tempdir().expect("tempdir");
        let root = parent.path().join("Results");
        let sink = DirectorySink::new(&root);

        for label in ["..", ".", "a/b", "../escape", "/abs"] {
            assert_eq!(
                sink.sheet_dir(&SheetId::new(label)),
                root.join("unknown_id"),
                "id {label:?}"
            );
        }
        assert_eq!(sink.sheet_dir(&SheetId::new("S42")), root.join("S42"));

        let entry = SheetEntry::file("..", "/in/...png");
        let written = sink
            .persist(&SheetId::new(".."), &entry, &reading())
            .expect("persist");
        assert!(written.iter().all(|path| path.starts_with(&root)));
        assert!(root.join("unknown_id").join("...json").is_file());
        assert!(!parent.path().join("...json").exists());
    }

    #[test]
    fn unwritable_root_is_an_io_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").expect("write");
        let sink = DirectorySink::new(&blocker);
        let result = sink.persist(
            &SheetId::unknown(),
            &SheetEntry::file("a", "/in/a.png"),
            &reading(),
        );
        assert!(matches!(result, Err(SheetmarkError::Io(_))));
    }
}

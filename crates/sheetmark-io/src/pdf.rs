// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF sheet source — every page of every PDF in a directory becomes one sheet.
//
// Pages are expected to be scans: each page carries an image XObject holding
// the sheet raster. That image is decoded directly; vector content is not
// rendered. JPEG (`DCTDecode`) streams go through the `image` crate; raw or
// Flate-compressed 8-bit DeviceRGB / DeviceGray samples are rebuilt from
// the stream dictionary.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use sheetmark_core::error::{Result, SheetmarkError};
use tracing::{debug, info, instrument, warn};

use crate::source::{SheetEntry, SheetSource, file_stem, files_with_extension, to_rgb};

/// A directory of scanned PDF documents.
///
/// The most recently opened document is kept so the pages of one file are
/// decoded from a single parse.
#[derive(Debug)]
pub struct PdfSource {
    dir: PathBuf,
    open: Mutex<Option<(PathBuf, Arc<Document>)>>,
}

impl PdfSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parsed document at `path`, reusing the cached one when it matches.
    fn document(&self, path: &Path) -> Result<Arc<Document>> {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, document)) = open.as_ref() {
            if cached == path {
                return Ok(Arc::clone(document));
            }
        }
        let document = Arc::new(open_document(path)?);
        *open = Some((path.to_path_buf(), Arc::clone(&document)));
        Ok(document)
    }
}

impl SheetSource for PdfSource {
    /// One entry per page, named `<stem>_page_<n>` with `n` from 1.
    ///
    /// A PDF that cannot be parsed is listed as a single page-less entry
    /// named after its stem; loading it reports the parse error, so only
    /// that document fails.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn entries(&self) -> Result<Vec<SheetEntry>> {
        let mut entries = Vec::new();
        for path in files_with_extension(&self.dir, &["pdf"])? {
            let stem = file_stem(&path);
            let document = match self.document(&path) {
                Ok(document) => document,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Unreadable PDF");
                    entries.push(SheetEntry::file(stem, path));
                    continue;
                }
            };
            let pages: Vec<u32> = document.get_pages().keys().copied().collect();
            debug!(file = %path.display(), pages = pages.len(), "PDF pages listed");
            for page in pages {
                entries.push(SheetEntry::page(
                    format!("{stem}_page_{page}"),
                    path.clone(),
                    page,
                ));
            }
        }
        info!(count = entries.len(), "PDF sheets found");
        Ok(entries)
    }

    fn load(&self, entry: &SheetEntry) -> Result<DynamicImage> {
        let document = self.document(&entry.path)?;
        let page = entry.page.ok_or_else(|| {
            SheetmarkError::Pdf(format!("entry {} has no page number", entry.name))
        })?;
        page_image(&document, page)
    }
}

fn open_document(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|err| {
        SheetmarkError::Pdf(format!("failed to open {}: {}", path.display(), err))
    })
}

/// Decode the largest raster image on 1-based `page`.
#[instrument(skip(document))]
pub fn page_image(document: &Document, page: u32) -> Result<DynamicImage> {
    let pages = document.get_pages();
    let page_id = *pages.get(&page).ok_or_else(|| {
        SheetmarkError::Pdf(format!(
            "page {} out of range (document has {} pages)",
            page,
            pages.len()
        ))
    })?;

    let resources = page_resources(document, page_id)?;
    let xobjects = match resources.get(b"XObject") {
        Ok(object) => resolve_dict(document, object)?,
        Err(_) => return Err(no_raster(page)),
    };

    let mut images: Vec<&Stream> = Vec::new();
    for (_, object) in xobjects.iter() {
        let Ok((_, Object::Stream(stream))) = document.dereference(object) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Image");
        if is_image {
            images.push(stream);
        }
    }

    let largest = images
        .into_iter()
        .max_by_key(|stream| dimension(stream, b"Width") * dimension(stream, b"Height"))
        .ok_or_else(|| no_raster(page))?;
    let image = decode_image_stream(largest)?;
    debug!(
        page,
        width = image.width(),
        height = image.height(),
        "Page raster decoded"
    );
    Ok(to_rgb(image))
}

/// Page resources, following `Parent` links for inherited dictionaries.
fn page_resources(document: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    let mut node = document.get_dictionary(page_id).map_err(pdf_err)?;
    loop {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(document, resources);
        }
        let parent = node
            .get(b"Parent")
            .and_then(Object::as_reference)
            .map_err(|_| SheetmarkError::Pdf("page has no resources".into()))?;
        node = document.get_dictionary(parent).map_err(pdf_err)?;
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Result<&'a Dictionary> {
    let (_, object) = document.dereference(object).map_err(pdf_err)?;
    object.as_dict().map_err(pdf_err)
}

fn dimension(stream: &Stream, key: &[u8]) -> u64 {
    stream
        .dict
        .get(key)
        .and_then(Object::as_i64)
        .map_or(0, |v| v.max(0) as u64)
}

/// Decode one image XObject stream.
pub fn decode_image_stream(stream: &Stream) -> Result<DynamicImage> {
    let filters: Vec<Vec<u8>> = stream
        .filters()
        .map(|f| f.into_iter().map(<[u8]>::to_vec).collect())
        .unwrap_or_default();

    if filters.iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).map_err(
            |err| SheetmarkError::Image(format!("failed to decode JPEG page image: {err}")),
        );
    }
    if let Some(other) = filters.iter().find(|f| f.as_slice() != b"FlateDecode") {
        return Err(SheetmarkError::Pdf(format!(
            "unsupported image filter {}",
            String::from_utf8_lossy(other)
        )));
    }

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(pdf_err)?
    };

    let width = dimension(stream, b"Width") as u32;
    let height = dimension(stream, b"Height") as u32;
    let bits = dimension(stream, b"BitsPerComponent");
    if bits != 8 {
        return Err(SheetmarkError::Pdf(format!(
            "unsupported bits per component: {bits}"
        )));
    }
    let color_space = stream
        .dict
        .get(b"ColorSpace")
        .and_then(Object::as_name)
        .map(<[u8]>::to_vec)
        .unwrap_or_default();

    let size_error = || {
        SheetmarkError::Pdf(format!(
            "image samples do not match {width}x{height} {}",
            String::from_utf8_lossy(&color_space)
        ))
    };
    match color_space.as_slice() {
        b"DeviceRGB" => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(size_error),
        b"DeviceGray" => GrayImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(size_error),
        other => Err(SheetmarkError::Pdf(format!(
            "unsupported color space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn no_raster(page: u32) -> SheetmarkError {
    SheetmarkError::Pdf(format!("page {page} has no raster image"))
}

fn pdf_err(err: lopdf::Error) -> SheetmarkError {
    SheetmarkError::Pdf(err.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;
    use lopdf::dictionary;
    use std::io::Cursor;

    pub(crate) enum PageImage {
        Raw(RgbImage),
        Jpeg(RgbImage),
        None,
    }

    fn image_stream(page: &PageImage) -> Option<Stream> {
        let (img, filter, content) = match page {
            PageImage::Raw(img) => (img, None, img.as_raw().clone()),
            PageImage::Jpeg(img) => {
                let mut bytes = Vec::new();
                img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
                    .expect("encode jpeg");
                (img, Some("DCTDecode"), bytes)
            }
            PageImage::None => return None,
        };
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img.width() as i64,
            "Height" => img.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(filter) = filter {
            dict.set("Filter", filter);
        }
        Some(Stream::new(dict, content))
    }

    pub(crate) fn write_pdf(path: &Path, pages: &[PageImage]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let mut resources = Dictionary::new();
            if let Some(stream) = image_stream(page) {
                let image_id = doc.add_object(stream);
                resources.set("XObject", dictionary! { "Im0" => image_id });
            }
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                b"q 100 0 0 100 0 0 cm /Im0 Do Q".to_vec(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("save pdf");
    }

    fn solid(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn pages_become_named_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_pdf(
            &dir.path().join("exam.pdf"),
            &[PageImage::Raw(solid(4, 4, 0)), PageImage::Raw(solid(4, 4, 255))],
        );
        write_pdf(&dir.path().join("another.PDF"), &[PageImage::Raw(solid(2, 2, 9))]);
        std::fs::write(dir.path().join("ignored.png"), b"x").expect("write");

        let entries = PdfSource::new(dir.path()).entries().expect("entries");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["another_page_1", "exam_page_1", "exam_page_2"]);
        assert_eq!(entries[2].page, Some(2));
    }

    #[test]
    fn raw_rgb_page_is_decoded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scan.pdf");
        let mut img = solid(6, 3, 200);
        img.put_pixel(1, 2, Rgb([10, 20, 30]));
        write_pdf(&path, &[PageImage::Raw(img.clone())]);

        let source = PdfSource::new(dir.path());
        let entry = source.entries().expect("entries").remove(0);
        let decoded = source.load(&entry).expect("load");
        assert_eq!(decoded.to_rgb8(), img);
    }

    #[test]
    fn jpeg_page_is_decoded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("photo.pdf");
        write_pdf(&path, &[PageImage::Jpeg(solid(32, 24, 128))]);

        let source = PdfSource::new(dir.path());
        let entry = source.entries().expect("entries").remove(0);
        let decoded = source.load(&entry).expect("load");
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
        assert_eq!(decoded.color().channel_count(), 3);
    }

    #[test]
    fn page_without_image_fails_only_that_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mixed.pdf");
        write_pdf(&path, &[PageImage::None, PageImage::Raw(solid(2, 2, 0))]);

        let source = PdfSource::new(dir.path());
        let entries = source.entries().expect("entries");
        assert_eq!(entries.len(), 2);
        assert!(matches!(
            source.load(&entries[0]),
            Err(SheetmarkError::Pdf(_))
        ));
        assert!(source.load(&entries[1]).is_ok());
    }

    #[test]
    fn corrupt_pdf_is_listed_but_fails_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_pdf(&dir.path().join("good.pdf"), &[PageImage::Raw(solid(2, 2, 0))]);
        std::fs::write(dir.path().join("zz_broken.pdf"), b"%PDF-1.5 garbage").expect("write");

        let source = PdfSource::new(dir.path());
        let entries = source.entries().expect("entries");
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["good_page_1", "zz_broken"]);
        assert!(source.load(&entries[0]).is_ok());
        assert!(matches!(
            source.load(&entries[1]),
            Err(SheetmarkError::Pdf(_))
        ));
    }

    #[test]
    fn pages_of_one_file_share_a_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("two.pdf");
        write_pdf(&path, &[PageImage::Raw(solid(2, 2, 0)), PageImage::Raw(solid(3, 3, 9))]);

        let source = PdfSource::new(dir.path());
        let first = source.document(&path).expect("open");
        let entries = source.entries().expect("entries");
        assert!(Arc::ptr_eq(&first, &source.document(&path).expect("cached")));

        // The cached parse still serves every page after the file is gone.
        std::fs::remove_file(&path).expect("remove");
        assert_eq!(source.load(&entries[1]).expect("page 2").width(), 3);
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.pdf");
        write_pdf(&path, &[PageImage::Raw(solid(2, 2, 0))]);
        let entry = SheetEntry::page("one_page_5", &path, 5);
        assert!(matches!(
            PdfSource::new(dir.path()).load(&entry),
            Err(SheetmarkError::Pdf(_))
        ));
    }
}

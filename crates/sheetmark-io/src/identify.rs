// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet identification — decide which sheet ID a batch entry's results are
// filed under.

use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use sheetmark_core::types::SheetId;

use crate::source::SheetEntry;

static SHEET_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ID:\s*(\w+)").unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// Assigns a sheet ID to each batch entry. Never fails: anything that cannot
/// be identified is filed under [`SheetId::UNKNOWN`].
pub trait SheetIdentifier {
    fn identify(&self, entry: &SheetEntry, image: &DynamicImage) -> SheetId;
}

/// Files every sheet under `unknown_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownIdentifier;

impl SheetIdentifier for UnknownIdentifier {
    fn identify(&self, _entry: &SheetEntry, _image: &DynamicImage) -> SheetId {
        SheetId::unknown()
    }
}

/// Files every sheet under its own entry name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StemIdentifier;

impl SheetIdentifier for StemIdentifier {
    fn identify(&self, entry: &SheetEntry, _image: &DynamicImage) -> SheetId {
        SheetId::new(entry.name.as_str())
    }
}

/// First `ID: <word>` label in recognised text.
pub fn parse_sheet_id(text: &str) -> Option<SheetId> {
    SHEET_ID_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| SheetId::new(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(1, 1))
    }

    #[test]
    fn parses_first_label() {
        let text = "Name: Ada\nID: A1234 \nID: B999";
        assert_eq!(parse_sheet_id(text), Some(SheetId::new("A1234")));
    }

    #[test]
    fn label_without_space() {
        assert_eq!(parse_sheet_id("ID:x_7"), Some(SheetId::new("x_7")));
    }

    #[test]
    fn label_is_case_sensitive_and_required() {
        assert_eq!(parse_sheet_id("id: 123"), None);
        assert_eq!(parse_sheet_id("ID: "), None);
        assert_eq!(parse_sheet_id(""), None);
    }

    #[test]
    fn fixed_identifiers() {
        let entry = SheetEntry::file("scan_07", "/in/scan_07.png");
        assert!(UnknownIdentifier.identify(&entry, &blank()).is_unknown());
        assert_eq!(
            StemIdentifier.identify(&entry, &blank()).as_str(),
            "scan_07"
        );
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text normalization applied to manga-ocr output

use anyhow::{Context, Result};
use regex::Regex;

/// Normalizes decoded manga-ocr text
///
/// 1. Remove all whitespace
/// 2. Replace `…` with `...`
/// 3. Replace runs of two or more `・` or `.` with the same number of `.`
/// 4. Convert half-width ASCII to full-width
#[derive(Debug, Clone)]
pub struct TextPostprocessor {
    dot_runs: Regex,
}

impl TextPostprocessor {
    pub fn new() -> Result<Self> {
        let dot_runs = Regex::new(r"[・.]{2,}").context("Failed to compile dot pattern")?;
        Ok(Self { dot_runs })
    }

    pub fn process(&self, text: &str) -> String {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.replace('…', "...");

        let dotted = self
            .dot_runs
            .replace_all(&compact, |caps: &regex::Captures| ".".repeat(caps[0].chars().count()));

        to_full_width(&dotted)
    }
}

/// Map printable ASCII `!`..`~` onto the full-width block U+FF01..U+FF5E
pub fn to_full_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '!'..='~' => char::from_u32(c as u32 - 0x21 + 0xFF01).unwrap_or(c),
            _ => c,
        })
        .collect()
}

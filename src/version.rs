// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the manga inference service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-13";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "comic-text-detector",
    "manga-ocr",
    "tight-line-bbox",
    "vertical-text-rotation",
    "debug-images",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "Manga Inference {} ({}) [{}]",
        VERSION_NUMBER,
        BUILD_DATE,
        FEATURES.join(", ")
    )
}

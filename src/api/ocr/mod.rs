// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR API endpoint module
//!
//! Provides POST /ocr/detect and POST /ocr/text-only for manga page uploads.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{detect_handler, text_only_handler};
pub use request::{UploadForm, UploadedFile};
pub use response::{OcrDetectResponse, TextOnlyResponse};

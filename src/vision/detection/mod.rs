// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text detection with comic-text-detector
//!
//! Produces text blocks (speech bubbles, captions) with per-line polygons,
//! orientation, font size and reading order.

pub mod lines;
pub mod model;
pub mod preprocessing;
pub mod textblock;
pub mod yolo;

pub use lines::TextLine;
pub use model::{ComicTextDetector, Detection};
pub use preprocessing::{preprocess_for_detector, Letterbox, DETECTOR_INPUT_SIZE};
pub use textblock::{group_blocks, Language, TextBlock};
pub use yolo::DetectedBlock;

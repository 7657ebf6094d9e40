// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Japanese manga text recognition with manga-ocr
//!
//! A ViT encoder and BERT decoder exported to ONNX, decoded greedily.

pub mod combined;
pub mod decoder;
pub mod encoder;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod vocab;

pub use model::{MangaOcr, ModelLayout, COMBINED_FILE, DECODER_FILE, ENCODER_FILE, VOCAB_FILE};
pub use postprocessing::TextPostprocessor;
pub use preprocessing::{preprocess_for_manga_ocr, MANGA_OCR_INPUT_SIZE};
pub use vocab::Vocabulary;

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! manga-ocr recognizer
//!
//! Supports two directory layouts, both with `vocab.txt`:
//! - split: `encoder_model.onnx` + `decoder_model.onnx`
//! - combined: `manga-ocr.onnx`

use anyhow::Result;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::combined::CombinedMangaOcr;
use super::decoder::MangaOcrDecoder;
use super::encoder::MangaOcrEncoder;
use super::postprocessing::TextPostprocessor;
use super::preprocessing::preprocess_for_manga_ocr;
use super::vocab::Vocabulary;
use crate::vision::session::Device;

pub const VOCAB_FILE: &str = "vocab.txt";
pub const ENCODER_FILE: &str = "encoder_model.onnx";
pub const DECODER_FILE: &str = "decoder_model.onnx";
pub const COMBINED_FILE: &str = "manga-ocr.onnx";

/// Which model files a manga-ocr directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLayout {
    Split,
    Combined,
}

impl ModelLayout {
    /// Inspect a model directory, preferring the split layout
    pub fn detect(model_dir: &Path) -> Option<Self> {
        if model_dir.join(ENCODER_FILE).exists() && model_dir.join(DECODER_FILE).exists() {
            Some(ModelLayout::Split)
        } else if model_dir.join(COMBINED_FILE).exists() {
            Some(ModelLayout::Combined)
        } else {
            None
        }
    }

    /// ONNX files this layout needs
    pub fn model_files(&self) -> &'static [&'static str] {
        match self {
            ModelLayout::Split => &[ENCODER_FILE, DECODER_FILE],
            ModelLayout::Combined => &[COMBINED_FILE],
        }
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Split {
        encoder: MangaOcrEncoder,
        decoder: MangaOcrDecoder,
    },
    Combined(CombinedMangaOcr),
}

/// Japanese manga text recognizer
#[derive(Debug, Clone)]
pub struct MangaOcr {
    backend: Backend,
    layout: ModelLayout,
    vocab: Arc<Vocabulary>,
    postprocessor: TextPostprocessor,
}

impl MangaOcr {
    /// Load manga-ocr from a model directory
    ///
    /// # Errors
    /// Returns error if the directory holds neither layout, `vocab.txt` is
    /// missing, or a session fails to load.
    pub fn new<P: AsRef<Path>>(model_dir: P, device: Device, intra_threads: usize) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let layout = ModelLayout::detect(model_dir).ok_or_else(|| {
            anyhow::anyhow!(
                "manga-ocr model not found in {}: expected {} + {} or {}",
                model_dir.display(),
                ENCODER_FILE,
                DECODER_FILE,
                COMBINED_FILE
            )
        })?;

        let vocab = Vocabulary::from_file(model_dir.join(VOCAB_FILE))?;

        let backend = match layout {
            ModelLayout::Split => Backend::Split {
                encoder: MangaOcrEncoder::new(model_dir.join(ENCODER_FILE), device, intra_threads)?,
                decoder: MangaOcrDecoder::new(model_dir.join(DECODER_FILE), device, intra_threads)?,
            },
            ModelLayout::Combined => Backend::Combined(CombinedMangaOcr::new(
                model_dir.join(COMBINED_FILE),
                device,
                intra_threads,
            )?),
        };

        info!(
            "✅ manga-ocr loaded ({:?} layout, {} tokens, {})",
            layout,
            vocab.len(),
            device
        );

        Ok(Self {
            backend,
            layout,
            vocab: Arc::new(vocab),
            postprocessor: TextPostprocessor::new()?,
        })
    }

    pub fn layout(&self) -> ModelLayout {
        self.layout
    }

    /// Recognize the text in a single line or bubble image
    pub fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let pixel_values = preprocess_for_manga_ocr(image);

        let tokens = match &self.backend {
            Backend::Split { encoder, decoder } => {
                let hidden = encoder.encode(pixel_values)?;
                decoder.generate(&hidden)?
            }
            Backend::Combined(model) => model.generate(&pixel_values)?,
        };

        let raw = self.vocab.decode(&tokens);
        let text = self.postprocessor.process(&raw);
        debug!("manga-ocr: {} tokens -> '{}'", tokens.len(), text);
        Ok(text)
    }
}

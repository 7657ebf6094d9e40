// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-file manga-ocr export taking the image and token ids together

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::decoder::{argmax_last, generate, token_tensor};
use crate::vision::session::{build_session, Device};

#[derive(Clone)]
pub struct CombinedMangaOcr {
    session: Arc<Mutex<Session>>,
    image_name: String,
    ids_name: String,
}

impl std::fmt::Debug for CombinedMangaOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedMangaOcr")
            .field("image_name", &self.image_name)
            .field("ids_name", &self.ids_name)
            .finish_non_exhaustive()
    }
}

impl CombinedMangaOcr {
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, intra_threads: usize) -> Result<Self> {
        let session = build_session(model_path.as_ref(), "manga-ocr model", device, intra_threads)?;

        let names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let image_name = names
            .iter()
            .find(|n| n.as_str() == "image" || n.contains("pixel"))
            .cloned()
            .unwrap_or_else(|| "image".to_string());
        let ids_name = names
            .iter()
            .find(|n| n.contains("token") || n.contains("input_ids"))
            .cloned()
            .unwrap_or_else(|| "token_ids".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            image_name,
            ids_name,
        })
    }

    fn next_token(&self, image: &Array4<f32>, tokens: &[u32]) -> Result<u32> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("manga-ocr session lock poisoned: {}", e))?;

        let image_value =
            Value::from_array(image.to_owned()).context("Failed to create image tensor")?;
        let ids_value =
            Value::from_array(token_tensor(tokens)).context("Failed to create token tensor")?;

        let outputs = session
            .run(ort::inputs![
                &self.image_name => image_value,
                &self.ids_name => ids_value
            ])
            .context("manga-ocr inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits")?;
        argmax_last(logits)
    }

    /// Decode token ids for a preprocessed `[1, 3, 224, 224]` image
    pub fn generate(&self, image: &Array4<f32>) -> Result<Vec<u32>> {
        generate(|tokens| self.next_token(image, tokens))
    }
}

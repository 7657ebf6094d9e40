// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! manga-ocr vision encoder (split model layout)

use anyhow::{Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::vision::session::{build_session, Device};

/// ViT encoder producing hidden states for the decoder
#[derive(Clone)]
pub struct MangaOcrEncoder {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for MangaOcrEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaOcrEncoder")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl MangaOcrEncoder {
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, intra_threads: usize) -> Result<Self> {
        let session = build_session(
            model_path.as_ref(),
            "manga-ocr encoder",
            device,
            intra_threads,
        )?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Encode a preprocessed `[1, 3, 224, 224]` tensor into `[1, seq_len, hidden]`
    pub fn encode(&self, pixel_values: Array4<f32>) -> Result<Array3<f32>> {
        let shape = pixel_values.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Encoder session lock poisoned: {}", e))?;

        let input_value =
            Value::from_array(pixel_values).context("Failed to create input tensor")?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Encoder inference failed")?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder output")?;
        debug!("Encoder output shape: {:?}", hidden.shape());

        Ok(hidden
            .into_dimensionality::<Ix3>()
            .context("Encoder output is not [batch, seq_len, hidden]")?
            .to_owned())
    }
}

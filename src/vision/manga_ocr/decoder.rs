// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! manga-ocr text decoder and greedy generation

use anyhow::{Context, Result};
use ndarray::{s, Array2, Array3, ArrayViewD, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::vocab::{END_TOKEN_ID, START_TOKEN_ID};
use crate::vision::session::{build_session, Device};

/// Maximum sequence length, start token included
pub const MAX_LENGTH: usize = 300;

/// Token ids as a `[1, len]` i64 tensor
pub(crate) fn token_tensor(tokens: &[u32]) -> Array2<i64> {
    let mut ids = Array2::<i64>::zeros((1, tokens.len()));
    for (i, &token) in tokens.iter().enumerate() {
        ids[[0, i]] = token as i64;
    }
    ids
}

/// Highest scoring id at the last position of `[1, len, vocab]` logits
pub(crate) fn argmax_last(logits: ArrayViewD<f32>) -> Result<u32> {
    let logits = logits
        .into_dimensionality::<Ix3>()
        .context("Logits are not [batch, len, vocab]")?;
    let (_, len, vocab) = logits.dim();
    if len == 0 || vocab == 0 {
        anyhow::bail!("Empty logits: {:?}", logits.shape());
    }

    let (best, _) = logits
        .slice(s![0, len - 1, ..])
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    Ok(best as u32)
}

/// Greedy autoregressive decoding
///
/// `next_token` picks the next id for the sequence so far.
/// Stops after the end token or at `MAX_LENGTH`.
pub(crate) fn generate<F>(mut next_token: F) -> Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> Result<u32>,
{
    let mut tokens = vec![START_TOKEN_ID];
    while tokens.len() < MAX_LENGTH {
        let next = next_token(&tokens)?;
        tokens.push(next);
        if next == END_TOKEN_ID {
            break;
        }
    }
    debug!("Generation complete: {} tokens", tokens.len());
    Ok(tokens)
}

/// BERT decoder attending to encoder hidden states (split model layout)
#[derive(Clone)]
pub struct MangaOcrDecoder {
    session: Arc<Mutex<Session>>,
    ids_name: String,
    hidden_name: String,
}

impl std::fmt::Debug for MangaOcrDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaOcrDecoder")
            .field("ids_name", &self.ids_name)
            .field("hidden_name", &self.hidden_name)
            .finish_non_exhaustive()
    }
}

impl MangaOcrDecoder {
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, intra_threads: usize) -> Result<Self> {
        let session = build_session(
            model_path.as_ref(),
            "manga-ocr decoder",
            device,
            intra_threads,
        )?;

        let names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let ids_name = names
            .iter()
            .find(|n| n.contains("input_ids"))
            .cloned()
            .unwrap_or_else(|| "input_ids".to_string());
        let hidden_name = names
            .iter()
            .find(|n| n.contains("encoder_hidden_states"))
            .cloned()
            .unwrap_or_else(|| "encoder_hidden_states".to_string());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            ids_name,
            hidden_name,
        })
    }

    /// Next token id for the sequence so far
    pub fn next_token(&self, hidden: &Array3<f32>, tokens: &[u32]) -> Result<u32> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Decoder session lock poisoned: {}", e))?;

        let ids_value =
            Value::from_array(token_tensor(tokens)).context("Failed to create input IDs tensor")?;
        let hidden_value = Value::from_array(hidden.to_owned())
            .context("Failed to create encoder hidden states tensor")?;

        let outputs = session
            .run(ort::inputs![
                &self.ids_name => ids_value,
                &self.hidden_name => hidden_value
            ])
            .context("Decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits")?;
        argmax_last(logits)
    }

    /// Decode token ids from encoder hidden states
    pub fn generate(&self, hidden: &Array3<f32>) -> Result<Vec<u32>> {
        generate(|tokens| self.next_token(hidden, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_tensor() {
        let ids = token_tensor(&[2, 10, 11]);
        assert_eq!(ids.shape(), &[1, 3]);
        assert_eq!(ids[[0, 2]], 11);
    }

    #[test]
    fn test_argmax_last_position() {
        let mut logits = Array3::<f32>::zeros((1, 2, 4));
        logits[[0, 0, 1]] = 9.0;
        logits[[0, 1, 3]] = 2.0;
        assert_eq!(argmax_last(logits.view().into_dyn()).unwrap(), 3);
    }

    #[test]
    fn test_argmax_rejects_bad_shape() {
        let logits = Array2::<f32>::zeros((2, 4));
        assert!(argmax_last(logits.view().into_dyn()).is_err());
    }

    #[test]
    fn test_generate_stops_at_end_token() {
        let script = [10, 11, END_TOKEN_ID, 12];
        let mut step = 0;
        let tokens = generate(|_| {
            let next = script[step];
            step += 1;
            Ok(next)
        })
        .unwrap();
        assert_eq!(tokens, vec![START_TOKEN_ID, 10, 11, END_TOKEN_ID]);
    }

    #[test]
    fn test_generate_caps_length() {
        let tokens = generate(|_| Ok(42)).unwrap();
        assert_eq!(tokens.len(), MAX_LENGTH);
        assert_eq!(tokens[0], START_TOKEN_ID);
    }

    #[test]
    fn test_model_not_found_error() {
        let err = MangaOcrDecoder::new("/nonexistent/decoder_model.onnx", Device::Cpu, 1)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

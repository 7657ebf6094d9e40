// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! manga-ocr WordPiece vocabulary

use anyhow::Result;
use std::path::Path;
use tokenizers::models::wordpiece::WordPiece;
use tracing::debug;

/// Decoding starts from `[CLS]`
pub const START_TOKEN_ID: u32 = 2;

/// Decoding stops at `[SEP]`
pub const END_TOKEN_ID: u32 = 3;

/// Ids below this are special tokens (`[PAD]`, `[UNK]`, `[CLS]`, `[SEP]`, `[MASK]`)
const FIRST_REGULAR_ID: u32 = 5;

/// Id to token table
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Load `vocab.txt`, one token per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("manga-ocr vocabulary not found: {}", path.display());
        }

        let path_str = path.to_string_lossy();
        let vocab = WordPiece::read_file(&path_str)
            .map_err(|e| anyhow::anyhow!("Failed to read vocabulary {}: {}", path.display(), e))?;

        // Duplicate lines leave gaps, so size by the highest id
        let size = vocab.values().max().map_or(0, |&id| id as usize + 1);
        let mut tokens = vec![String::new(); size];
        for (token, id) in vocab {
            if let Some(slot) = tokens.get_mut(id as usize) {
                *slot = token;
            }
        }
        debug!("Loaded manga-ocr vocabulary with {} tokens", tokens.len());

        Ok(Self { tokens })
    }

    /// Build from tokens listed in id order
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Join token ids into text, skipping special tokens and `##` markers
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter(|&&id| id >= FIRST_REGULAR_ID)
            .filter_map(|&id| self.tokens.get(id as usize))
            .map(|token| token.strip_prefix("##").unwrap_or(token))
            .collect()
    }
}

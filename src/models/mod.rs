// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod downloading;

pub use downloading::{
    ensure_present, fetch_models, fetch_with, missing_files, DownloadError, FetchReport,
    HubSource, ModelSource,
};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod version;
pub mod vision;

pub use api::server::{create_router, start_server, AppState};
pub use config::{DeviceKind, ServiceConfig};

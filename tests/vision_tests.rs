// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/vision_tests.rs - Include all vision test modules

mod vision {
    mod test_line_pipeline;
    mod test_model_manager;
}

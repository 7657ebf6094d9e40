// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Grouping, tight boxes, line crops and debug output without models

use image::{Rgb, RgbImage};
use manga_inference::vision::crop::{prepare_line_for_ocr, transformed_region};
use manga_inference::vision::debug_image::debug_image_path;
use manga_inference::vision::detection::{group_blocks, DetectedBlock, Language, TextLine};
use manga_inference::vision::geometry::xyxy_to_quad;
use manga_inference::vision::DebugRenderer;
use tempfile::TempDir;

const PAGE_W: u32 = 400;
const PAGE_H: u32 = 300;

fn page() -> RgbImage {
    RgbImage::from_pixel(PAGE_W, PAGE_H, Rgb([255, 255, 255]))
}

fn column(x: f32) -> TextLine {
    TextLine {
        quad: xyxy_to_quad([x, 50.0, x + 20.0, 150.0]),
        score: 0.7,
    }
}

fn speech_bubble() -> Vec<manga_inference::vision::detection::TextBlock> {
    let detected = [DetectedBlock {
        xyxy: [250, 30, 340, 180],
        confidence: 0.9,
        class_id: 1,
    }];
    let lines = [column(270.0), column(300.0)];
    group_blocks(&detected, &lines, PAGE_W, PAGE_H, None)
}

#[test]
fn test_vertical_bubble_uses_tight_bbox() {
    let blocks = speech_bubble();
    assert_eq!(blocks.len(), 1);

    let block = &blocks[0];
    assert_eq!(block.language, Language::Ja);
    assert!(block.vertical);
    assert_eq!(block.font_size, 20.0);
    assert_eq!(block.confidence, 0.9);
    assert_eq!(block.tight_bbox(), [270, 50, 320, 150]);

    // Right column is read first
    assert_eq!(block.lines[0][0][0], 300.0);
    assert_eq!(block.lines[1][0][0], 270.0);
}

#[test]
fn test_vertical_lines_are_cropped_upright() {
    let mut image = page();
    // Mark the top of the right column
    for y in 50..60 {
        for x in 300..320 {
            image.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }

    let blocks = speech_bubble();
    let block = &blocks[0];
    for idx in 0..block.lines.len() {
        let region = transformed_region(&image, block, idx, block.text_height()).unwrap();
        assert_eq!(region.dimensions(), (100, 20));

        let prepared = prepare_line_for_ocr(region, block.vertical);
        assert_eq!(prepared.dimensions(), (20, 100));
    }

    let first = prepare_line_for_ocr(
        transformed_region(&image, block, 0, block.text_height()).unwrap(),
        true,
    );
    assert_eq!(first.get_pixel(10, 3)[0], 0);
    assert_eq!(first.get_pixel(10, 90)[0], 255);
}

#[test]
fn test_debug_image_is_written_next_to_base() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("chapter1").join("p001.jpg");
    let blocks = speech_bubble();
    let texts = vec!["よし、行こう".to_string()];

    let renderer = DebugRenderer::without_font();
    let path = renderer.save(&page(), &blocks, &texts, &base, true).unwrap();

    assert_eq!(path, debug_image_path(&base));
    assert_eq!(path, dir.path().join("chapter1").join("p001_debug.jpg"));
    let written = image::open(&path).unwrap();
    assert_eq!(written.width(), PAGE_W);
    assert_eq!(written.height(), PAGE_H);
}

#[test]
fn test_unmatched_line_without_mask_is_kept() {
    let detected = [DetectedBlock {
        xyxy: [0, 0, 50, 50],
        confidence: 0.8,
        class_id: 0,
    }];
    let stray = TextLine {
        quad: xyxy_to_quad([200.0, 200.0, 300.0, 220.0]),
        score: 0.6,
    };
    let blocks = group_blocks(&detected, &[stray], PAGE_W, PAGE_H, None);

    let scattered = blocks
        .iter()
        .find(|b| b.language == Language::Unknown)
        .expect("scattered block");
    assert!(!scattered.vertical);
    assert_eq!(scattered.confidence, 0.6);
    assert_eq!(scattered.tight_bbox(), [200, 200, 300, 220]);
}

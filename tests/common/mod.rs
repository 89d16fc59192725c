// Shared fixtures for the integration tests.
//
// The crate's own `detection::test_support` is `cfg(test)` and not visible
// from here, so the few painting helpers the integration tests need live in
// this module.
#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};

use match_scenes::assets::MaskAssets;
use match_scenes::context::TimerKind;
use match_scenes::detection::timer::timer_roi;
use match_scenes::matcher::{MatcherSpec, Roi, REFERENCE_1080P, REFERENCE_720P};
use match_scenes::ocr::GlyphClassifier;

pub const WHITE: Rgb<u8> = Rgb([250, 250, 250]);
pub const BLACK: Rgb<u8> = Rgb([10, 10, 10]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// 3x5 pixel font, one string per row
const FONT: &[(char, [&str; 5])] = &[
    ('0', ["###", "#.#", "#.#", "#.#", "###"]),
    ('2', ["###", "..#", "###", "#..", "###"]),
    ('3', ["###", "..#", "###", "..#", "###"]),
    ('5', ["###", "#..", "###", "..#", "###"]),
    ('9', ["###", "#.#", "###", "..#", "###"]),
    (':', [".", "#", ".", "#", "."]),
];

const SCALE: u32 = 3;
const GAP: u32 = 2 * SCALE;

/// Draw `text` in white at (`left`, `top`) of `image`
pub fn render_text(image: &mut RgbImage, text: &str, left: u32, top: u32) {
    let mut x0 = left;
    for ch in text.chars() {
        let (_, rows) = FONT
            .iter()
            .find(|(c, _)| *c == ch)
            .unwrap_or_else(|| panic!("no glyph for {:?}", ch));
        let columns = rows[0].len() as u32;
        for (row, line) in rows.iter().enumerate() {
            for (col, cell) in line.chars().enumerate() {
                if cell != '#' {
                    continue;
                }
                for dy in 0..SCALE {
                    for dx in 0..SCALE {
                        let x = x0 + col as u32 * SCALE + dx;
                        let y = top + row as u32 * SCALE + dy;
                        image.put_pixel(x, y, WHITE);
                    }
                }
            }
        }
        x0 += columns * SCALE + GAP;
    }
}

/// Standard timer position in the high-resolution layout
pub fn standard_timer_roi() -> Roi {
    timer_roi(TimerKind::Standard)
}

/// High-resolution frame showing `remaining` in the standard timer slot
pub fn timer_frame(remaining: &str) -> RgbImage {
    let mut frame = RgbImage::from_pixel(REFERENCE_1080P.0, REFERENCE_1080P.1, BLACK);
    let roi = standard_timer_roi();
    render_text(&mut frame, remaining, roi.x + 8, roi.y + 10);
    frame
}

/// Classifier trained on the timer font as it appears in the timer slot
pub fn timer_classifier() -> GlyphClassifier {
    let mut classifier = GlyphClassifier::new();
    for line in ["3:00", "2:59"] {
        let crop = standard_timer_roi().crop(&timer_frame(line)).expect("timer ROI inside frame");
        assert_eq!(classifier.add_line(line, &crop), 4, "training line {}", line);
    }
    classifier.train().expect("classifier trains");
    classifier
}

/// Vertical stripes, foreground where `(x / period)` is even
pub fn stripe_mask(width: u32, height: u32, period: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        if (x / period) % 2 == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// One distinct ROI-sized stripe mask per spec
pub fn assets_for(specs: &[MatcherSpec]) -> MaskAssets {
    let mut assets = MaskAssets::in_memory();
    for (index, spec) in specs.iter().enumerate() {
        let mask = stripe_mask(spec.roi.width, spec.roi.height, 2 + index as u32);
        assets = assets.with_mask(spec.mask_file, mask);
    }
    assets
}

pub fn blank_frame() -> RgbImage {
    RgbImage::from_pixel(REFERENCE_720P.0, REFERENCE_720P.1, BLACK)
}

/// Paint the spec's ROI so its mask's foreground shows `fg` and the rest `bg`
pub fn paint(frame: &mut RgbImage, spec: &MatcherSpec, assets: &MaskAssets, fg: Rgb<u8>, bg: Rgb<u8>) {
    let mask = assets.load_gray(spec.mask_file).expect("mask registered");
    let roi = spec.roi;
    for y in 0..roi.height {
        for x in 0..roi.width {
            let color = if mask.get_pixel(x, y)[0] > 127 { fg } else { bg };
            frame.put_pixel(roi.x + x, roi.y + y, color);
        }
    }
}

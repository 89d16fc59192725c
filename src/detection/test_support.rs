//! Synthetic masks and frames for detector tests
use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::assets::MaskAssets;
use crate::context::Context;
use crate::matcher::{MatcherSpec, REFERENCE_720P};

pub const WHITE: Rgb<u8> = Rgb([250, 250, 250]);
pub const BLACK: Rgb<u8> = Rgb([10, 10, 10]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

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

/// One distinct ROI-sized stripe mask per `MatcherSpec`
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
    let mask = assets.load_gray(spec.mask_file).unwrap();
    let roi = spec.roi;
    let full_frame = mask.dimensions() == roi.reference;

    for y in 0..roi.height {
        for x in 0..roi.width {
            let value = if full_frame {
                mask.get_pixel(roi.x + x, roi.y + y)[0]
            } else {
                mask.get_pixel(x, y)[0]
            };
            let color = if value > 127 { fg } else { bg };
            frame.put_pixel(roi.x + x, roi.y + y, color);
        }
    }
}

/// Context positioned at `tick`, 100 ms per tick
pub fn context_with(ctx: &mut Context, tick: u64, frame: &Arc<RgbImage>) {
    ctx.engine.tick = tick;
    ctx.engine.msec = tick * 100;
    ctx.engine.frame = Some(Arc::clone(frame));
}

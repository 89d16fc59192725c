/// Debug preview canvas helpers
///
/// Detectors draw onto `EngineTick::preview` to show which regions they
/// looked at. The canvas may have any resolution; ROIs are rescaled to it.
use image::{Rgb, RgbImage};

use crate::matcher::Roi;

/// Outline `roi` on the canvas with a 1px border
pub fn draw_rect(canvas: &mut RgbImage, roi: Roi, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let scaled = roi.scaled_to((width, height));
    let left = scaled.x.min(width - 1);
    let top = scaled.y.min(height - 1);
    let right = scaled.x.saturating_add(scaled.width).saturating_sub(1).min(width - 1);
    let bottom = scaled.y.saturating_add(scaled.height).saturating_sub(1).min(height - 1);

    for x in left..=right {
        canvas.put_pixel(x, top, color);
        canvas.put_pixel(x, bottom, color);
    }
    for y in top..=bottom {
        canvas.put_pixel(left, y, color);
        canvas.put_pixel(right, y, color);
    }
}

/// Fill `roi` on the canvas (color swatches)
pub fn fill_rect(canvas: &mut RgbImage, roi: Roi, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let scaled = roi.scaled_to((width, height));
    let right = scaled.x.saturating_add(scaled.width).min(width);
    let bottom = scaled.y.saturating_add(scaled.height).min(height);

    for y in scaled.y..bottom {
        for x in scaled.x..right {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Glyph preprocessing
///
/// Turns a color crop into a binary text mask and normalizes segmented
/// glyphs into fixed-size sample bitmaps for the nearest-neighbor lookup.
use image::{GrayImage, Luma, RgbImage};

use crate::matcher::PixelClass;

/// Default sample geometry (width x height)
pub const SAMPLE_WIDTH: u32 = 10;
pub const SAMPLE_HEIGHT: u32 = 17;

/// White text on any background: low saturation, high value
pub fn white_text() -> PixelClass {
    PixelClass::white_with((0, 48), (224, 255))
}

/// Binarize a crop: 255 where `text` accepts the pixel
pub fn binarize(image: &RgbImage, text: &PixelClass) -> GrayImage {
    text.classify(image)
}

/// Foreground pixels per column
pub fn column_histogram(mask: &GrayImage) -> Vec<u32> {
    let (width, height) = mask.dimensions();
    (0..width)
        .map(|x| (0..height).filter(|&y| mask.get_pixel(x, y)[0] != 0).count() as u32)
        .collect()
}

/// Foreground pixels per row, restricted to columns `x0..x1`
pub fn row_histogram(mask: &GrayImage, x0: u32, x1: u32) -> Vec<u32> {
    let (width, height) = mask.dimensions();
    let x1 = x1.min(width);
    (0..height)
        .map(|y| (x0..x1).filter(|&x| mask.get_pixel(x, y)[0] != 0).count() as u32)
        .collect()
}

/// Tight `(start, end)` span of non-zero entries, end exclusive
pub fn occupied_span(histogram: &[u32]) -> Option<(u32, u32)> {
    let first = histogram.iter().position(|&count| count > 0)?;
    let last = histogram.iter().rposition(|&count| count > 0)?;
    Some((first as u32, last as u32 + 1))
}

/// Crop a glyph to the bounding box of its foreground
pub fn trim_to_content(glyph: &GrayImage) -> Option<GrayImage> {
    let (width, _) = glyph.dimensions();
    let (x0, x1) = occupied_span(&column_histogram(glyph))?;
    let (y0, y1) = occupied_span(&row_histogram(glyph, 0, width))?;
    Some(image::imageops::crop_imm(glyph, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Scale a glyph into the sample box, keeping its aspect ratio.
///
/// The scaled glyph is anchored top-left and the rest of the box is zero.
/// Returns `None` for an empty glyph or one that collapses to zero pixels.
pub fn resize_sample(glyph: &GrayImage, out_width: u32, out_height: u32) -> Option<GrayImage> {
    let (in_width, in_height) = glyph.dimensions();
    if in_width == 0 || in_height == 0 || out_width == 0 || out_height == 0 {
        return None;
    }

    let scale = (out_width as f64 / in_width as f64).min(out_height as f64 / in_height as f64);
    let scaled_width = ((in_width as f64 * scale + 1e-9) as u32).min(out_width);
    let scaled_height = ((in_height as f64 * scale + 1e-9) as u32).min(out_height);
    if scaled_width == 0 || scaled_height == 0 {
        return None;
    }

    let mut sample = GrayImage::new(out_width, out_height);
    for y in 0..scaled_height {
        // Nearest neighbor: centre of the output pixel mapped back
        let src_y = (((y as f64 + 0.5) / scale) as u32).min(in_height - 1);
        for x in 0..scaled_width {
            let src_x = (((x as f64 + 0.5) / scale) as u32).min(in_width - 1);
            let value = if glyph.get_pixel(src_x, src_y)[0] > 127 { 255 } else { 0 };
            sample.put_pixel(x, y, Luma([value]));
        }
    }

    Some(sample)
}

/// Fraction of foreground pixels
pub fn fill_ratio(mask: &GrayImage) -> f32 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    mask.pixels().filter(|p| p[0] != 0).count() as f32 / total as f32
}

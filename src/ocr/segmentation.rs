/// Glyph segmentation
///
/// A binary text mask is cut into glyphs in two steps: a horizontal policy
/// picks column spans, then a vertical policy trims each span to its rows.
use image::{imageops, GrayImage};

use super::preprocessing::{column_histogram, occupied_span, row_histogram};

/// Glyphs must be wider and taller than this many pixels
pub const MIN_GLYPH_EXTENT: u32 = 2;

/// Which edge a fixed-width window is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Right,
}

/// Horizontal segmentation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segmenter {
    /// Each run of columns whose foreground count exceeds `threshold`
    PerCharacter { threshold: u32 },
    /// One window of `width` columns at the given edge
    FixedWidth { width: u32, anchor: Anchor },
}

impl Default for Segmenter {
    fn default() -> Self {
        Segmenter::PerCharacter { threshold: 0 }
    }
}

impl Segmenter {
    /// Column spans `(start, end)`, end exclusive, left to right
    pub fn cut(&self, histogram: &[u32]) -> Vec<(u32, u32)> {
        match *self {
            Segmenter::PerCharacter { threshold } => {
                let mut spans = Vec::new();
                let mut start: Option<usize> = None;

                for (x, &count) in histogram.iter().enumerate() {
                    match (start, count > threshold) {
                        (None, true) => start = Some(x),
                        (Some(begin), false) => {
                            push_span(&mut spans, begin, x);
                            start = None;
                        }
                        _ => {}
                    }
                }
                // A run reaching the right edge ends there
                if let Some(begin) = start {
                    push_span(&mut spans, begin, histogram.len());
                }

                spans
            }
            Segmenter::FixedWidth { width, anchor } => {
                let len = histogram.len() as u32;
                let (start, end) = match anchor {
                    Anchor::Left => (0, width.min(len)),
                    Anchor::Right => (len.saturating_sub(width), len),
                };
                if end - start > MIN_GLYPH_EXTENT {
                    vec![(start, end)]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

fn push_span(spans: &mut Vec<(u32, u32)>, start: usize, end: usize) {
    if end - start > MIN_GLYPH_EXTENT as usize {
        spans.push((start as u32, end as u32));
    }
}

/// Vertical extent policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalTrim {
    /// Every glyph shares the row span of the whole line
    #[default]
    PerLine,
    /// Each glyph is trimmed to its own rows
    PerCharacter,
}

/// One segmented glyph, cropped out of the binary mask
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub x: u32,
    pub y: u32,
    pub bitmap: GrayImage,
}

impl Glyph {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Cut `mask` into glyphs, left to right.
///
/// Glyphs whose vertical extent is not taller than `MIN_GLYPH_EXTENT` are
/// dropped as noise.
pub fn extract_glyphs(mask: &GrayImage, segmenter: Segmenter, trim: VerticalTrim) -> Vec<Glyph> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let spans = segmenter.cut(&column_histogram(mask));
    let line_rows = match trim {
        VerticalTrim::PerLine => occupied_span(&row_histogram(mask, 0, width)),
        VerticalTrim::PerCharacter => None,
    };

    spans
        .into_iter()
        .filter_map(|(x0, x1)| {
            let rows = match trim {
                VerticalTrim::PerLine => line_rows,
                VerticalTrim::PerCharacter => occupied_span(&row_histogram(mask, x0, x1)),
            }?;
            let (y0, y1) = rows;
            if y1 - y0 <= MIN_GLYPH_EXTENT {
                return None;
            }
            Some(Glyph {
                x: x0,
                y: y0,
                bitmap: imageops::crop_imm(mask, x0, y0, x1 - x0, y1 - y0).to_image(),
            })
        })
        .collect()
}

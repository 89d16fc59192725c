/// Glyph OCR for small fixed vocabularies (timers, counters)
///
/// A read goes through four stages:
/// - `preprocessing`: binarize the crop and normalize glyph bitmaps
/// - `segmentation`: cut the binary mask into glyphs
/// - `knn`: classify each glyph against the trained samples (k = 3)
/// - this module: geometric filters and string assembly
///
/// Every per-frame call returns `None` instead of failing. Only model
/// loading and training report errors.
pub mod knn;
pub mod preprocessing;
pub mod segmentation;

use std::fs;
use std::path::Path;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::matcher::PixelClass;
use knn::{KnnIndex, K};
use preprocessing::{binarize, fill_ratio, resize_sample, trim_to_content, white_text};
pub use preprocessing::{SAMPLE_HEIGHT, SAMPLE_WIDTH};
pub use segmentation::{extract_glyphs, Anchor, Glyph, Segmenter, VerticalTrim};

/// Glyphs with less foreground than this are treated as blank
const BLANK_GLYPH_RATIO: f32 = 0.1 / 255.0;

/// Anything that turns a crop into text
pub trait TextReader: Send {
    /// Text in `image`, keeping only glyphs within `constraints`
    fn read_text(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<String>;

    /// Text parsed as an unsigned number, `None` on any non-digit
    fn read_digits(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<u64> {
        self.read_text(image, constraints)?.parse().ok()
    }
}

/// Inclusive geometric limits applied to a read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphConstraints {
    pub glyph_count: Option<(usize, usize)>,
    pub glyph_width: Option<(u32, u32)>,
    pub glyph_height: Option<(u32, u32)>,
}

impl GlyphConstraints {
    pub fn glyph_count(mut self, min: usize, max: usize) -> Self {
        self.glyph_count = Some((min, max));
        self
    }

    pub fn glyph_width(mut self, min: u32, max: u32) -> Self {
        self.glyph_width = Some((min, max));
        self
    }

    pub fn glyph_height(mut self, min: u32, max: u32) -> Self {
        self.glyph_height = Some((min, max));
        self
    }

    fn accepts(&self, glyph: &Glyph) -> bool {
        let within = |range: Option<(u32, u32)>, value: u32| {
            range.map_or(true, |(min, max)| (min..=max).contains(&value))
        };
        within(self.glyph_height, glyph.height()) && within(self.glyph_width, glyph.width())
    }
}

/// One labelled, normalized training bitmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphSample {
    pub label: char,
    pub bitmap: Vec<u8>,
}

/// On-disk model layout
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    sample_width: u32,
    sample_height: u32,
    samples: Vec<GlyphSample>,
}

#[derive(Debug, Clone)]
pub struct GlyphClassifier {
    sample_width: u32,
    sample_height: u32,
    segmenter: Segmenter,
    vertical_trim: VerticalTrim,
    text_color: PixelClass,
    samples: Vec<GlyphSample>,
    index: Option<KnnIndex>,
}

impl Default for GlyphClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphClassifier {
    pub fn new() -> Self {
        Self::with_sample_size(SAMPLE_WIDTH, SAMPLE_HEIGHT)
    }

    pub fn with_sample_size(sample_width: u32, sample_height: u32) -> Self {
        Self {
            sample_width,
            sample_height,
            segmenter: Segmenter::default(),
            vertical_trim: VerticalTrim::default(),
            text_color: white_text(),
            samples: Vec::new(),
            index: None,
        }
    }

    pub fn segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn vertical_trim(mut self, trim: VerticalTrim) -> Self {
        self.vertical_trim = trim;
        self
    }

    pub fn text_color(mut self, text_color: PixelClass) -> Self {
        self.text_color = text_color;
        self
    }

    pub fn sample_size(&self) -> (u32, u32) {
        (self.sample_width, self.sample_height)
    }

    pub fn samples(&self) -> &[GlyphSample] {
        &self.samples
    }

    pub fn is_trained(&self) -> bool {
        self.index.is_some()
    }

    /// Normalize a binary glyph and append it to the training set.
    ///
    /// The glyph is trimmed to its foreground first, so any crop around the
    /// character yields the same sample as segmentation would. Returns false
    /// if the glyph is blank.
    pub fn add_sample(&mut self, label: char, glyph: &GrayImage) -> bool {
        let Some(bitmap) = trim_to_content(glyph)
            .and_then(|trimmed| resize_sample(&trimmed, self.sample_width, self.sample_height))
        else {
            tracing::warn!("Ignoring blank sample for {:?}", label);
            return false;
        };

        self.samples.push(GlyphSample {
            label,
            bitmap: bitmap.into_raw(),
        });
        true
    }

    /// Segment a color crop and label its glyphs with `text`, left to right.
    ///
    /// Nothing is added when the glyph count differs from the label count.
    pub fn add_line(&mut self, text: &str, image: &RgbImage) -> usize {
        let Some(glyphs) = self.find_samples(image, &GlyphConstraints::default()) else {
            return 0;
        };
        let labels: Vec<char> = text.chars().collect();
        if glyphs.len() != labels.len() {
            tracing::warn!(
                "Training line {:?} segmented into {} glyphs, expected {}",
                text,
                glyphs.len(),
                labels.len()
            );
            return 0;
        }

        // Already normalized the way reads normalize them
        let mut added = 0;
        for (label, sample) in labels.into_iter().zip(glyphs) {
            if fill_ratio(&sample) < BLANK_GLYPH_RATIO {
                continue;
            }
            self.samples.push(GlyphSample {
                label,
                bitmap: sample.into_raw(),
            });
            added += 1;
        }
        added
    }

    /// Rebuild the nearest-neighbor index from the current samples
    pub fn train(&mut self) -> Result<(), ModelError> {
        if self.samples.is_empty() {
            return Err(ModelError::Empty);
        }

        let expected = self
            .sample_width
            .checked_mul(self.sample_height)
            .filter(|&pixels| pixels > 0)
            .ok_or(ModelError::Geometry {
                width: self.sample_width,
                height: self.sample_height,
            })? as usize;
        if let Some((index, sample)) = self
            .samples
            .iter()
            .enumerate()
            .find(|(_, sample)| sample.bitmap.len() != expected)
        {
            return Err(ModelError::SampleSize {
                index,
                actual: sample.bitmap.len(),
                expected,
            });
        }

        let index = KnnIndex::new(
            expected,
            self.samples
                .iter()
                .map(|sample| (sample.label, sample.bitmap.clone())),
        );
        tracing::debug!("Trained glyph classifier on {} samples", index.len());
        self.index = Some(index);
        Ok(())
    }

    /// Segment `image` into normalized sample bitmaps.
    ///
    /// `None` when the glyph count falls outside the constraints, or when
    /// any single accepted glyph cannot be normalized because its aspect
    /// ratio collapses one side of the sample to zero pixels. One such glyph
    /// discards the whole read rather than returning the text with a
    /// character missing.
    pub fn find_samples(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<Vec<GrayImage>> {
        let mask = binarize(image, &self.text_color);
        let mut samples = Vec::new();

        for glyph in extract_glyphs(&mask, self.segmenter, self.vertical_trim) {
            if !constraints.accepts(&glyph) {
                continue;
            }
            samples.push(resize_sample(&glyph.bitmap, self.sample_width, self.sample_height)?);
        }

        if let Some((min, max)) = constraints.glyph_count {
            if !(min..=max).contains(&samples.len()) {
                return None;
            }
        }

        Some(samples)
    }

    /// Read the text in `image`, left to right.
    ///
    /// All-or-nothing: see `find_samples` for when a read is dropped.
    pub fn match_text(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<String> {
        let index = self.index.as_ref()?;
        let samples = self.find_samples(image, constraints)?;

        let text: String = samples
            .iter()
            .filter(|sample| fill_ratio(sample) >= BLANK_GLYPH_RATIO)
            .filter_map(|sample| index.nearest(sample.as_raw(), K))
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn match_digits(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<u64> {
        self.match_text(image, constraints)?.parse().ok()
    }

    pub fn match_float(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<f64> {
        self.match_text(image, constraints)?.parse().ok()
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let model = ModelFile {
            sample_width: self.sample_width,
            sample_height: self.sample_height,
            samples: self.samples.clone(),
        };
        let json = serde_json::to_string(&model).map_err(|source| ModelError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ModelError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!("Saved {} glyph samples to {}", self.samples.len(), path.display());
        Ok(())
    }

    /// Load a model and train it
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path).map_err(|source| ModelError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let model: ModelFile = serde_json::from_str(&json).map_err(|source| ModelError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

        if model.sample_width == 0 || model.sample_height == 0 {
            return Err(ModelError::Geometry {
                width: model.sample_width,
                height: model.sample_height,
            });
        }

        let mut classifier = Self::with_sample_size(model.sample_width, model.sample_height);
        classifier.samples = model.samples;
        classifier.train()?;

        tracing::info!(
            "Loaded glyph model {} ({} samples)",
            path.display(),
            classifier.samples.len()
        );
        Ok(classifier)
    }
}

impl TextReader for GlyphClassifier {
    fn read_text(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<String> {
        self.match_text(image, constraints)
    }

    fn read_digits(&self, image: &RgbImage, constraints: &GlyphConstraints) -> Option<u64> {
        self.match_digits(image, constraints)
    }
}

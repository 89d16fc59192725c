/// Region matcher
///
/// Decides whether a rectangular region of a frame looks like a reference
/// mask. Two independent pixel classifiers label the region:
/// - reference foreground pixels should be frame foreground
/// - reference background pixels should be frame background
///
/// The fraction of agreeing pixels must reach `threshold`, and the fraction
/// of reference foreground actually found in the frame must reach
/// `orig_threshold`. The second test keeps nearly empty masks from matching
/// any dark region.
pub mod filters;
pub mod roi;

use image::{GrayImage, RgbImage};

use crate::error::AssetError;
pub use filters::{dominant_hue, ChannelRange, Hsv, PixelClass};
pub use roi::{Roi, REFERENCE_1080P, REFERENCE_720P};

/// Scores of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// Fraction of pixels where frame and reference agree
    pub agreement: f32,
    /// Fraction of reference foreground found as frame foreground
    pub orig: f32,
}

/// Calibration of one matcher, resolved against mask assets at startup
#[derive(Debug, Clone)]
pub struct MatcherSpec {
    pub label: &'static str,
    pub roi: Roi,
    pub mask_file: &'static str,
    pub threshold: f32,
    pub orig_threshold: f32,
    pub fg: PixelClass,
    pub bg: Option<PixelClass>,
}

#[derive(Debug, Clone)]
pub struct RegionMatcher {
    label: String,
    roi: Roi,
    /// Binarized reference, ROI sized, 255 = foreground
    mask: GrayImage,
    mask_fg_count: u32,
    fg: PixelClass,
    bg: Option<PixelClass>,
    threshold: f32,
    orig_threshold: f32,
}

impl RegionMatcher {
    /// Build a matcher from a grayscale reference mask.
    ///
    /// The mask may be either ROI sized or full reference size, in which
    /// case the ROI is cut out of it. Pixels above 127 are foreground.
    pub fn new(
        label: impl Into<String>,
        roi: Roi,
        mask: &GrayImage,
        fg: PixelClass,
        bg: Option<PixelClass>,
        threshold: f32,
        orig_threshold: f32,
    ) -> Result<Self, AssetError> {
        let label = label.into();

        let cropped = if mask.dimensions() == roi.size() {
            mask.clone()
        } else if mask.dimensions() == roi.reference {
            roi.crop_gray(mask).ok_or_else(|| AssetError::UnexpectedSize {
                name: label.clone(),
                actual: mask.dimensions(),
                expected: roi.reference,
            })?
        } else {
            return Err(AssetError::UnexpectedSize {
                name: label,
                actual: mask.dimensions(),
                expected: roi.reference,
            });
        };

        let mut binary = cropped;
        let mut mask_fg_count = 0;
        for pixel in binary.pixels_mut() {
            pixel[0] = if pixel[0] > 127 {
                mask_fg_count += 1;
                255
            } else {
                0
            };
        }

        if mask_fg_count == 0 {
            tracing::warn!("Mask {} has no foreground pixels and will never match", label);
        }

        Ok(Self {
            label,
            roi,
            mask: binary,
            mask_fg_count,
            fg,
            bg,
            threshold,
            orig_threshold,
        })
    }

    /// Build from a `MatcherSpec`, loading the mask through the asset resolver
    pub fn from_spec(spec: &MatcherSpec, assets: &crate::assets::MaskAssets) -> Result<Self, AssetError> {
        let mask = assets.load_gray(spec.mask_file)?;
        Self::new(
            spec.label,
            spec.roi,
            &mask,
            spec.fg.clone(),
            spec.bg.clone(),
            spec.threshold,
            spec.orig_threshold,
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Swap the background classifier (for matchers whose background color
    /// is only known at runtime)
    pub fn set_background(&mut self, bg: PixelClass) {
        self.bg = Some(bg);
    }

    /// Score the region without applying thresholds.
    ///
    /// `None` when the frame cannot be cropped (empty, too small).
    pub fn score(&self, frame: &RgbImage) -> Option<MatchScore> {
        let region = self.roi.crop(frame)?;
        if region.dimensions() != self.mask.dimensions() {
            return None;
        }

        let total = region.width() as u64 * region.height() as u64;
        if total == 0 {
            return None;
        }

        let mut agree = 0u64;
        let mut fg_hits = 0u64;

        for (pixel, reference) in region.pixels().zip(self.mask.pixels()) {
            let hsv = Hsv::from_rgb(pixel);
            let is_fg = self.fg.matches_hsv(hsv);
            if reference[0] != 0 {
                if is_fg {
                    agree += 1;
                    fg_hits += 1;
                }
            } else {
                let is_bg = match &self.bg {
                    Some(bg) => bg.matches_hsv(hsv),
                    None => !is_fg,
                };
                if is_bg {
                    agree += 1;
                }
            }
        }

        let orig = if self.mask_fg_count == 0 {
            0.0
        } else {
            fg_hits as f32 / self.mask_fg_count as f32
        };

        Some(MatchScore {
            agreement: agree as f32 / total as f32,
            orig,
        })
    }

    /// True iff both the agreement and the raw-similarity tests pass
    pub fn matches(&self, frame: &RgbImage) -> bool {
        let Some(score) = self.score(frame) else {
            return false;
        };

        let matched = self.mask_fg_count > 0
            && score.agreement >= self.threshold
            && score.orig >= self.orig_threshold;

        tracing::trace!(
            "{}: agreement {:.3} (>= {:.2}), orig {:.3} (>= {:.2}) -> {}",
            self.label,
            score.agreement,
            self.threshold,
            score.orig,
            self.orig_threshold,
            matched
        );

        matched
    }

    /// Outline the matcher's ROI on a debug canvas of any resolution
    pub fn draw_roi(&self, preview: &mut RgbImage, color: image::Rgb<u8>) {
        crate::preview::draw_rect(preview, self.roi, color);
    }

    /// Binarized reference mask as seen by the matcher
    pub fn reference_mask(&self) -> &GrayImage {
        &self.mask
    }
}

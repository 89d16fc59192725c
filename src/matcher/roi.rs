/// Regions of interest in a fixed reference resolution
use image::{imageops, GrayImage, RgbImage};

/// Reference layout of the standard frame
pub const REFERENCE_720P: (u32, u32) = (1280, 720);
/// Reference layout of the high-resolution frame
pub const REFERENCE_1080P: (u32, u32) = (1920, 1080);

/// Rectangle given in a reference resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub reference: (u32, u32),
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::in_reference(x, y, width, height, REFERENCE_720P)
    }

    pub const fn in_reference(x: u32, y: u32, width: u32, height: u32, reference: (u32, u32)) -> Self {
        Self {
            x,
            y,
            width,
            height,
            reference,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The same rectangle expressed in another resolution
    pub fn scaled_to(&self, target: (u32, u32)) -> Roi {
        if target == self.reference {
            return *self;
        }
        let sx = target.0 as f64 / self.reference.0 as f64;
        let sy = target.1 as f64 / self.reference.1 as f64;
        Roi {
            x: (self.x as f64 * sx).round() as u32,
            y: (self.y as f64 * sy).round() as u32,
            width: ((self.width as f64 * sx).round() as u32).max(1),
            height: ((self.height as f64 * sy).round() as u32).max(1),
            reference: target,
        }
    }

    /// True if the rectangle lies fully inside an image of `dimensions`
    pub fn fits(&self, dimensions: (u32, u32)) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= dimensions.0)
            && self.y.checked_add(self.height).is_some_and(|b| b <= dimensions.1)
    }

    /// Crop `frame` to this region, resampled to the ROI's reference size.
    ///
    /// Returns `None` when the frame is empty or the region falls outside it.
    pub fn crop(&self, frame: &RgbImage) -> Option<RgbImage> {
        let dimensions = frame.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            return None;
        }
        let scaled = self.scaled_to(dimensions);
        if !scaled.fits(dimensions) {
            return None;
        }
        let cropped =
            imageops::crop_imm(frame, scaled.x, scaled.y, scaled.width, scaled.height).to_image();
        if scaled.size() == self.size() {
            Some(cropped)
        } else {
            Some(imageops::resize(
                &cropped,
                self.width,
                self.height,
                imageops::FilterType::Nearest,
            ))
        }
    }

    /// Crop a reference-sized grayscale image (e.g. a full-frame mask)
    pub fn crop_gray(&self, image: &GrayImage) -> Option<GrayImage> {
        if !self.fits(image.dimensions()) {
            return None;
        }
        Some(imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image())
    }
}

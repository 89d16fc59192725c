/// Pixel classifiers
///
/// Pure predicates over a pixel's HSV representation. They carry no state,
/// so a classifier can be shared between matchers and swapped at runtime.
use image::{GrayImage, Rgb, RgbImage};
use rayon::prelude::*;

/// HSV on the 8-bit OpenCV scale: hue 0-179, saturation and value 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub fn from_rgb(pixel: &Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        let (r, g, b) = (r as i32, g as i32, b as i32);

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max == 0 { 0 } else { (delta * 255 + max / 2) / max };

        let h = if delta == 0 {
            0.0
        } else {
            let d = delta as f32;
            let h = if max == r {
                60.0 * (g - b) as f32 / d
            } else if max == g {
                120.0 + 60.0 * (b - r) as f32 / d
            } else {
                240.0 + 60.0 * (r - g) as f32 / d
            };
            if h < 0.0 {
                h + 360.0
            } else {
                h
            }
        };

        // 360 degrees folded into 0..180 so the hue fits a byte
        let h = ((h / 2.0).round() as u32 % 180) as u8;

        Self {
            h,
            s: s.clamp(0, 255) as u8,
            v: max as u8,
        }
    }

    /// Inverse conversion, used for painting preview swatches
    pub fn to_rgb(self) -> Rgb<u8> {
        let h = self.h as f32 * 2.0;
        let s = self.s as f32 / 255.0;
        let v = self.v as f32 / 255.0;

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_byte = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb([to_byte(r), to_byte(g), to_byte(b)])
    }
}

/// Inclusive range over one HSV channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    pub low: u8,
    pub high: u8,
}

impl ChannelRange {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Hue ranges may wrap around 180 (e.g. 170..=5 for reds)
    fn contains_hue(&self, hue: u8) -> bool {
        if self.low <= self.high {
            (self.low..=self.high).contains(&hue)
        } else {
            hue >= self.low || hue <= self.high
        }
    }

    fn contains(&self, value: u8) -> bool {
        (self.low..=self.high).contains(&value)
    }
}

/// A swappable per-pixel predicate
#[derive(Debug, Clone, PartialEq)]
pub enum PixelClass {
    /// Value within range
    Black { visibility: ChannelRange },
    /// Low saturation and high value
    White {
        saturation: ChannelRange,
        visibility: ChannelRange,
    },
    /// Like `Black` with a wider default range
    Dark { visibility: ChannelRange },
    /// Hue within range at the given value
    Hue {
        hue: ChannelRange,
        visibility: ChannelRange,
    },
    /// Everything the inner classifier rejects
    Not(Box<PixelClass>),
}

impl PixelClass {
    pub fn black() -> Self {
        PixelClass::Black {
            visibility: ChannelRange::new(0, 32),
        }
    }

    pub fn black_with(visibility: (u8, u8)) -> Self {
        PixelClass::Black {
            visibility: ChannelRange::new(visibility.0, visibility.1),
        }
    }

    pub fn white() -> Self {
        PixelClass::White {
            saturation: ChannelRange::new(0, 32),
            visibility: ChannelRange::new(230, 255),
        }
    }

    pub fn white_with(saturation: (u8, u8), visibility: (u8, u8)) -> Self {
        PixelClass::White {
            saturation: ChannelRange::new(saturation.0, saturation.1),
            visibility: ChannelRange::new(visibility.0, visibility.1),
        }
    }

    pub fn dark() -> Self {
        PixelClass::Dark {
            visibility: ChannelRange::new(0, 64),
        }
    }

    pub fn hue(hue: (u8, u8), visibility: (u8, u8)) -> Self {
        PixelClass::Hue {
            hue: ChannelRange::new(hue.0, hue.1),
            visibility: ChannelRange::new(visibility.0, visibility.1),
        }
    }

    /// Hue window of `center ± tolerance`, wrapping at 180
    pub fn hue_around(center: u8, tolerance: u8, visibility: (u8, u8)) -> Self {
        let center = center % 180;
        let tolerance = tolerance.min(89);
        let low = (center as i16 - tolerance as i16).rem_euclid(180) as u8;
        let high = ((center as u16 + tolerance as u16) % 180) as u8;
        Self::hue((low, high), visibility)
    }

    pub fn not_black() -> Self {
        Self::black().negate()
    }

    pub fn not_white() -> Self {
        Self::white().negate()
    }

    pub fn not_dark() -> Self {
        Self::dark().negate()
    }

    pub fn negate(self) -> Self {
        match self {
            PixelClass::Not(inner) => *inner,
            other => PixelClass::Not(Box::new(other)),
        }
    }

    pub fn matches_hsv(&self, hsv: Hsv) -> bool {
        match self {
            PixelClass::Black { visibility } | PixelClass::Dark { visibility } => {
                visibility.contains(hsv.v)
            }
            PixelClass::White {
                saturation,
                visibility,
            } => saturation.contains(hsv.s) && visibility.contains(hsv.v),
            PixelClass::Hue { hue, visibility } => {
                hue.contains_hue(hsv.h) && visibility.contains(hsv.v)
            }
            PixelClass::Not(inner) => !inner.matches_hsv(hsv),
        }
    }

    pub fn matches(&self, pixel: &Rgb<u8>) -> bool {
        self.matches_hsv(Hsv::from_rgb(pixel))
    }

    /// Binary mask of `image`: 255 where the classifier accepts, 0 elsewhere
    pub fn classify(&self, image: &RgbImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let mut mask = GrayImage::new(width, height);
        if width == 0 || height == 0 {
            return mask;
        }

        let row_size = width as usize;
        mask.as_flat_samples_mut()
            .samples
            .par_chunks_mut(row_size)
            .enumerate()
            .for_each(|(y, row_buffer)| {
                for (x, out) in row_buffer.iter_mut().enumerate() {
                    let pixel = image.get_pixel(x as u32, y as u32);
                    *out = if self.matches(pixel) { 255 } else { 0 };
                }
            });

        mask
    }
}

/// Most frequent hue among pixels at least as bright as `min_value`.
///
/// `None` when no pixel qualifies. Ties go to the lower hue.
pub fn dominant_hue<'a>(pixels: impl Iterator<Item = &'a Rgb<u8>>, min_value: u8) -> Option<u8> {
    let mut histogram = [0u32; 180];
    let mut counted = 0u32;
    for pixel in pixels {
        let hsv = Hsv::from_rgb(pixel);
        if hsv.v >= min_value {
            histogram[hsv.h as usize % 180] += 1;
            counted += 1;
        }
    }
    if counted == 0 {
        return None;
    }

    let mut best = 0;
    for (hue, &count) in histogram.iter().enumerate() {
        if count > histogram[best] {
            best = hue;
        }
    }
    Some(best as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        let red = Hsv::from_rgb(&Rgb([255, 0, 0]));
        assert_eq!(red, Hsv { h: 0, s: 255, v: 255 });

        let green = Hsv::from_rgb(&Rgb([0, 255, 0]));
        assert_eq!(green.h, 60);

        let blue = Hsv::from_rgb(&Rgb([0, 0, 255]));
        assert_eq!(blue.h, 120);

        let gray = Hsv::from_rgb(&Rgb([128, 128, 128]));
        assert_eq!(gray, Hsv { h: 0, s: 0, v: 128 });

        let black = Hsv::from_rgb(&Rgb([0, 0, 0]));
        assert_eq!(black, Hsv { h: 0, s: 0, v: 0 });
    }

    #[test]
    fn test_hsv_round_trip_for_saturated_colors() {
        for hue in [0u8, 30, 60, 90, 120, 150] {
            let rgb = Hsv { h: hue, s: 255, v: 255 }.to_rgb();
            let back = Hsv::from_rgb(&rgb);
            assert!(
                (back.h as i16 - hue as i16).abs() <= 1,
                "hue {} came back as {}",
                hue,
                back.h
            );
        }
    }

    #[test]
    fn test_black_and_white() {
        assert!(PixelClass::black().matches(&Rgb([10, 10, 10])));
        assert!(!PixelClass::black().matches(&Rgb([100, 100, 100])));

        assert!(PixelClass::white().matches(&Rgb([250, 250, 250])));
        assert!(!PixelClass::white().matches(&Rgb([250, 100, 100])));
        assert!(!PixelClass::white().matches(&Rgb([150, 150, 150])));

        assert!(PixelClass::not_white().matches(&Rgb([0, 0, 0])));
        assert!(PixelClass::not_dark().matches(&Rgb([200, 200, 200])));
        assert!(!PixelClass::not_dark().matches(&Rgb([20, 20, 20])));
    }

    #[test]
    fn test_hue_range_wraps() {
        let reds = PixelClass::hue_around(2, 5, (100, 255));
        assert!(reds.matches(&Rgb([255, 0, 0])));
        assert!(reds.matches(&Rgb([255, 0, 20])));
        assert!(!reds.matches(&Rgb([0, 255, 0])));
        // Too dark for the visibility range
        assert!(!reds.matches(&Rgb([60, 0, 0])));
    }

    #[test]
    fn test_negate_is_involutive() {
        let class = PixelClass::white();
        assert_eq!(class.clone().negate().negate(), class);
    }

    #[test]
    fn test_dominant_hue() {
        let pixels = [
            Rgb([0, 0, 255]),
            Rgb([0, 255, 0]),
            Rgb([0, 0, 250]),
            // Too dark to count
            Rgb([20, 0, 0]),
            Rgb([20, 0, 0]),
            Rgb([20, 0, 0]),
        ];
        assert_eq!(dominant_hue(pixels.iter(), 30), Some(120));
        assert_eq!(dominant_hue(pixels[3..].iter(), 30), None);
    }

    #[test]
    fn test_classify_mask() {
        let mut image = RgbImage::from_pixel(4, 3, Rgb([0, 0, 0]));
        image.put_pixel(1, 1, Rgb([255, 255, 255]));
        image.put_pixel(3, 2, Rgb([255, 255, 255]));

        let mask = PixelClass::white().classify(&image);
        assert_eq!(mask.dimensions(), (4, 3));
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        assert_eq!(mask.get_pixel(3, 2)[0], 255);
        assert_eq!(mask.pixels().filter(|p| p[0] == 255).count(), 2);
    }
}

/// Team color estimation from the player icons at the top of the HUD
///
/// Runs once per match, when the match begins. Tri-color battles are not
/// supported: only the two standard team ROIs are sampled.
use image::{GrayImage, Rgb, RgbImage};

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use super::state_machine::StateMachine;
use crate::assets::MaskAssets;
use crate::context::{Context, TeamColor};
use crate::error::AssetError;
use crate::matcher::{dominant_hue, Hsv, Roi, REFERENCE_720P};
use crate::messaging::Event;

pub const INKLINGS_MASK: &str = "v3_game_inklings2.png";

/// Darker pixels are absent players or outlines
const MIN_VALUE: u8 = 30;
const SWATCH_HEIGHT: u32 = 5;

pub const TEAM_ROIS: [Roi; 2] = [Roi::new(350, 15, 240, 60), Roi::new(697, 15, 240, 60)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamColorsScene {
    Default,
    WaitForTimeout,
}

fn swatch_color(hue: u8) -> Rgb<u8> {
    Hsv { h: hue, s: 128, v: 255 }.to_rgb()
}

pub struct TeamColorsDetector {
    fsm: StateMachine<TeamColorsScene>,
    /// Player icon silhouettes, full frame
    mask: GrayImage,
}

impl TeamColorsDetector {
    pub fn new(assets: &MaskAssets) -> Result<Self, AssetError> {
        let mask = assets.load_gray(INKLINGS_MASK)?;
        if mask.dimensions() != REFERENCE_720P {
            return Err(AssetError::UnexpectedSize {
                name: INKLINGS_MASK.to_string(),
                actual: mask.dimensions(),
                expected: REFERENCE_720P,
            });
        }
        Ok(Self {
            fsm: StateMachine::new("team_colors", TeamColorsScene::Default),
            mask,
        })
    }

    pub fn state(&self) -> TeamColorsScene {
        self.fsm.state()
    }

    /// State including a switch requested earlier in this tick
    fn effective_state(&self) -> TeamColorsScene {
        self.fsm.pending().unwrap_or_else(|| self.fsm.state())
    }

    fn team_hue(&self, frame: &RgbImage, roi: Roi) -> Option<u8> {
        let crop = roi.crop(frame)?;
        let mask = roi.crop_gray(&self.mask)?;
        let pixels = crop
            .pixels()
            .zip(mask.pixels())
            .filter(|(_, m)| m[0] > 127)
            .map(|(pixel, _)| pixel);
        dominant_hue(pixels, MIN_VALUE)
    }

    /// Dominant hue of each team, `None` unless both are visible
    pub fn estimate(&self, frame: &RgbImage) -> Option<[TeamColor; 2]> {
        let left = self.team_hue(frame, TEAM_ROIS[0])?;
        let right = self.team_hue(frame, TEAM_ROIS[1])?;
        Some([left, right].map(|hue| TeamColor {
            hue,
            rgb: swatch_color(hue).0,
        }))
    }

    fn draw_swatches(&self, preview: &mut RgbImage, frame: &RgbImage) {
        for roi in TEAM_ROIS {
            let Some(hue) = self.team_hue(frame, roi) else {
                continue;
            };
            let swatch = Roi::new(roi.x, roi.y + roi.height, roi.width, SWATCH_HEIGHT);
            crate::preview::fill_rect(preview, swatch, swatch_color(hue));
        }
    }
}

impl Detector for TeamColorsDetector {
    fn id(&self) -> SceneId {
        SceneId::TeamColors
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, _events: &mut Emitter) -> bool {
        self.fsm.begin_tick(ctx.msec());
        let Some(frame) = ctx.engine.frame.clone() else {
            return false;
        };
        if let Some(preview) = ctx.engine.preview.as_mut() {
            self.draw_swatches(preview, &frame);
        }
        false
    }

    fn on_event(&mut self, ctx: &mut Context, event: &Event, events: &mut Emitter) {
        match event {
            Event::GameBeginning => {
                // Once per match
                if self.effective_state() == TeamColorsScene::WaitForTimeout {
                    return;
                }
                let Some(frame) = ctx.engine.frame.clone() else {
                    return;
                };
                match self.estimate(&frame) {
                    Some(colors) => {
                        ctx.game.team_colors = Some(colors);
                        events.emit(Event::TeamColorsDetected { colors });
                    }
                    None => tracing::warn!("Match began but team colors are not visible"),
                }
                self.fsm.switch_state(TeamColorsScene::WaitForTimeout);
            }
            Event::TimerReset => self.reset(),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.fsm.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::*;
    use image::Luma;
    use std::sync::Arc;

    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    const ORANGE: Rgb<u8> = Rgb([255, 128, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

    /// Icons cover the left half of each team ROI
    fn detector() -> TeamColorsDetector {
        let mut mask = GrayImage::new(REFERENCE_720P.0, REFERENCE_720P.1);
        for roi in TEAM_ROIS {
            for y in roi.y..roi.y + roi.height {
                for x in roi.x..roi.x + roi.width / 2 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        TeamColorsDetector::new(&MaskAssets::in_memory().with_mask(INKLINGS_MASK, mask)).unwrap()
    }

    fn frame() -> Arc<RgbImage> {
        let mut frame = blank_frame();
        for (roi, color) in TEAM_ROIS.iter().zip([BLUE, ORANGE]) {
            for y in roi.y..roi.y + roi.height {
                for x in roi.x..roi.x + roi.width {
                    let masked_out = x >= roi.x + roi.width / 2;
                    frame.put_pixel(x, y, if masked_out { GREEN } else { color });
                }
            }
        }
        Arc::new(frame)
    }

    #[test]
    fn test_estimate_uses_masked_pixels_only() {
        let colors = detector().estimate(&frame()).unwrap();
        assert_eq!(colors[0].hue, 120);
        assert_eq!(colors[1].hue, 15);
    }

    #[test]
    fn test_emits_on_beginning() {
        let mut detector = detector();
        let mut ctx = Context::new();
        context_with(&mut ctx, 1, &frame());

        let mut events = Emitter::new();
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        let events = events.drain();

        assert!(matches!(
            events.as_slice(),
            [Event::TeamColorsDetected { colors }] if colors[0].hue == 120 && colors[1].hue == 15
        ));
        assert_eq!(ctx.game.team_colors.map(|c| c[1].hue), Some(15));

        detector.detect(&mut ctx, &SceneRegistry::new(), &mut Emitter::new());
        assert_eq!(detector.state(), TeamColorsScene::WaitForTimeout);

        detector.on_event(&mut ctx, &Event::TimerReset, &mut Emitter::new());
        assert_eq!(detector.state(), TeamColorsScene::Default);
    }

    #[test]
    fn test_estimates_once_per_match() {
        let mut detector = detector();
        let mut ctx = Context::new();
        context_with(&mut ctx, 1, &frame());

        let mut events = Emitter::new();
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        assert_eq!(events.len(), 1);

        // Same tick, then a later tick: both ignored
        let mut events = Emitter::new();
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        context_with(&mut ctx, 2, &frame());
        detector.detect(&mut ctx, &SceneRegistry::new(), &mut Emitter::new());
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        assert!(events.is_empty());

        detector.on_event(&mut ctx, &Event::TimerReset, &mut Emitter::new());
        let mut events = Emitter::new();
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_dark_hud_emits_nothing() {
        let mut detector = detector();
        let mut ctx = Context::new();
        context_with(&mut ctx, 1, &Arc::new(blank_frame()));

        let mut events = Emitter::new();
        detector.on_event(&mut ctx, &Event::GameBeginning, &mut events);
        assert!(events.is_empty());
        assert_eq!(ctx.game.team_colors, None);
    }

    #[test]
    fn test_preview_swatches() {
        let mut detector = detector();
        let mut ctx = Context::new();
        context_with(&mut ctx, 1, &frame());
        ctx.engine.preview = Some(blank_frame());

        detector.detect(&mut ctx, &SceneRegistry::new(), &mut Emitter::new());
        let preview = ctx.engine.preview.unwrap();
        let roi = TEAM_ROIS[0];
        assert_eq!(*preview.get_pixel(roi.x, roi.y + roi.height), swatch_color(120));
    }

    #[test]
    fn test_mask_must_be_full_frame() {
        let assets = MaskAssets::in_memory().with_mask(INKLINGS_MASK, GrayImage::new(240, 60));
        assert!(matches!(
            TeamColorsDetector::new(&assets),
            Err(AssetError::UnexpectedSize { .. })
        ));
    }
}

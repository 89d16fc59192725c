/// "Finish!" banner detector
///
/// Two phases. The cheap one compares the dark lettering inside a small ROI.
/// Only when it passes, the tape color behind the lettering is estimated
/// and the full-frame matcher checks black text on that tape.
use image::{imageops, GrayImage, Rgb, RgbImage};

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use super::state_machine::StateMachine;
use crate::assets::MaskAssets;
use crate::context::Context;
use crate::error::AssetError;
use crate::matcher::{dominant_hue, Hsv, MatcherSpec, PixelClass, RegionMatcher, Roi, REFERENCE_720P};
use crate::messaging::Event;
use crate::utils::Debouncer;

pub const FINISH_MASK: &str = "v3_game_finish.png";

const HOLD_OFF_MS: u64 = 60_000;
/// Hue tolerance around the estimated tape color
const TAPE_HUE_RANGE: u8 = 10;
const TAPE_VISIBILITY: (u8, u8) = (30, 255);
/// Grey and white pixels carry no usable hue
const TAPE_MIN_SATURATION: u8 = 64;
/// Hue estimation runs on a downsampled frame
const SAMPLE_SIZE: (u32, u32) = (128, 72);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishScene {
    Default,
    WaitForTimeout,
}

/// Lettering check; the lettering is darker than the surrounding tape
pub fn lettering_spec() -> MatcherSpec {
    MatcherSpec {
        label: "finish_lettering",
        roi: Roi::new(970, 375, 173, 65),
        mask_file: FINISH_MASK,
        threshold: 0.9,
        orig_threshold: 0.0,
        fg: PixelClass::black_with((20, 70)).negate(),
        bg: None,
    }
}

/// Black text on the tape; the background is set per frame
pub fn banner_spec() -> MatcherSpec {
    MatcherSpec {
        label: "finish",
        roi: Roi::new(0, 0, REFERENCE_720P.0, REFERENCE_720P.1),
        mask_file: FINISH_MASK,
        threshold: 0.95,
        orig_threshold: 0.1,
        fg: PixelClass::black(),
        bg: None,
    }
}

/// Dominant hue of the tape, estimated on a thumbnail.
///
/// Only saturated pixels where `mask` is background (0) are counted, so
/// the lettering and the arena around the banner do not vote.
pub fn tape_hue(frame: &RgbImage, mask: &GrayImage) -> Option<u8> {
    let (width, height) = SAMPLE_SIZE;
    let small = imageops::resize(frame, width, height, imageops::FilterType::Nearest);
    let small_mask = imageops::resize(mask, width, height, imageops::FilterType::Nearest);

    let tape = small
        .pixels()
        .zip(small_mask.pixels())
        .filter(|(pixel, reference)| {
            reference[0] == 0 && Hsv::from_rgb(pixel).s >= TAPE_MIN_SATURATION
        })
        .map(|(pixel, _)| pixel);
    dominant_hue(tape, TAPE_VISIBILITY.0)
}

pub struct FinishDetector {
    fsm: StateMachine<FinishScene>,
    lettering: RegionMatcher,
    banner: RegionMatcher,
    fired: Debouncer,
}

impl FinishDetector {
    pub fn new(assets: &MaskAssets) -> Result<Self, AssetError> {
        Ok(Self {
            fsm: StateMachine::new("finish", FinishScene::Default),
            lettering: RegionMatcher::from_spec(&lettering_spec(), assets)?,
            banner: RegionMatcher::from_spec(&banner_spec(), assets)?,
            fired: Debouncer::new(HOLD_OFF_MS),
        })
    }

    pub fn state(&self) -> FinishScene {
        self.fsm.state()
    }

    /// Both phases against one frame
    pub fn matches(&mut self, frame: &RgbImage) -> bool {
        if !self.lettering.matches(frame) {
            return false;
        }

        let Some(hue) = tape_hue(frame, self.banner.reference_mask()) else {
            return false;
        };
        tracing::debug!("Finish lettering found, tape hue {}", hue);
        self.banner
            .set_background(PixelClass::hue_around(hue, TAPE_HUE_RANGE, TAPE_VISIBILITY));
        self.banner.matches(frame)
    }
}

impl Detector for FinishDetector {
    fn id(&self) -> SceneId {
        SceneId::Finish
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        let state = self.fsm.begin_tick(ctx.msec());
        let Some(frame) = ctx.engine.frame.clone() else {
            return false;
        };
        if let Some(preview) = ctx.engine.preview.as_mut() {
            self.lettering.draw_roi(preview, Rgb([255, 0, 255]));
        }

        let now = ctx.msec();
        match state {
            FinishScene::Default => {
                if !self.matches(&frame) {
                    return false;
                }
                tracing::info!("Finish banner at {} ms", now);
                ctx.game.finish_msec = Some(now);
                events.emit(Event::GameFinish);
                self.fired.record(now);
                self.fsm.switch_state(FinishScene::WaitForTimeout);
                true
            }
            FinishScene::WaitForTimeout => {
                if !self.fired.matched_in(now) {
                    self.reset();
                }
                false
            }
        }
    }

    fn reset(&mut self) {
        self.fsm.reset();
        self.fired.reset();
    }
}

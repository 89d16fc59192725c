/// Objective tracker for tower control and rainmaker
///
/// The HUD shows a horizontal progress line whose white section marks the
/// objective. Its average x position is mapped to a percentage of each
/// team's half, -100 (left goal) to 100 (right goal).
use image::{GrayImage, Rgb, RgbImage};

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use crate::assets::MaskAssets;
use crate::context::{Context, ObjectivePosition};
use crate::error::AssetError;
use crate::matcher::{Hsv, Roi, REFERENCE_720P};
use crate::messaging::Event;
use crate::utils::Debouncer;

pub const TOWER_MASK: &str = "v2_ui_tower.png";

const LINE_WIDTH: u32 = 610;
/// Row of the line crop that is sampled
const SAMPLE_ROW: u32 = 3;
/// Jumps larger than this are only accepted after a quiet period
const MAX_JUMP: i32 = 30;
const JUMP_HOLD_MS: u64 = 1_000;
const PLAUSIBLE_RANGE: f64 = 120.0;

pub fn line_roi() -> Roi {
    Roi::new(REFERENCE_720P.0 / 2 - LINE_WIDTH / 2, 100, LINE_WIDTH, 5)
}

/// Objective sitting on the neutral line is drawn in pale yellow
fn is_neutral(hsv: Hsv) -> bool {
    (20..=35).contains(&hsv.h) && hsv.s <= 100 && hsv.v >= 200
}

fn is_white(hsv: Hsv) -> bool {
    hsv.v >= 230 && hsv.s <= 20
}

pub struct ObjectiveTracker {
    /// Reliable parts of the line, ROI sized
    mask: GrayImage,
    last_update: Debouncer,
}

impl ObjectiveTracker {
    pub fn new(assets: &MaskAssets) -> Result<Self, AssetError> {
        let roi = line_roi();
        let mask = assets.load_gray(TOWER_MASK)?;
        let mask = if mask.dimensions() == roi.size() {
            mask
        } else if mask.dimensions() == roi.reference {
            roi.crop_gray(&mask).ok_or_else(|| AssetError::UnexpectedSize {
                name: TOWER_MASK.to_string(),
                actual: mask.dimensions(),
                expected: roi.reference,
            })?
        } else {
            return Err(AssetError::UnexpectedSize {
                name: TOWER_MASK.to_string(),
                actual: mask.dimensions(),
                expected: roi.reference,
            });
        };

        Ok(Self {
            mask,
            last_update: Debouncer::new(JUMP_HOLD_MS),
        })
    }

    /// Marker position in percent, `None` if the line shows no marker
    pub fn position(&self, frame: &RgbImage) -> Option<i32> {
        let line = line_roi().crop(frame)?;
        if SAMPLE_ROW >= line.height() {
            return None;
        }

        let (sum, count) = (0..line.width())
            .filter(|&x| self.mask.get_pixel(x, SAMPLE_ROW)[0] > 127)
            .filter(|&x| {
                let hsv = Hsv::from_rgb(line.get_pixel(x, SAMPLE_ROW));
                is_neutral(hsv) || is_white(hsv)
            })
            .fold((0u64, 0u64), |(sum, count), x| (sum + x as u64, count + 1));

        if count == 0 {
            return None;
        }

        let center = (LINE_WIDTH / 2) as f64;
        let average = sum as f64 / count as f64;
        let pct = (average - center) / (LINE_WIDTH as f64 * 0.97 / 2.0) * 100.0;
        if !(-PLAUSIBLE_RANGE..=PLAUSIBLE_RANGE).contains(&pct) {
            tracing::debug!("Discarding implausible objective position {:.1}", pct);
            return None;
        }
        Some(pct as i32)
    }
}

impl Detector for ObjectiveTracker {
    fn id(&self) -> SceneId {
        SceneId::Objective
    }

    fn dependencies(&self) -> &'static [SceneId] {
        &[SceneId::Lobby]
    }

    fn detect(&mut self, ctx: &mut Context, scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        if scenes.is_another_scene_matched(SceneId::Lobby) == Some(true) {
            return false;
        }
        if !ctx.game.rule.is_some_and(|rule| rule.has_objective_track()) {
            return false;
        }
        let Some(frame) = ctx.engine.frame.clone() else {
            return false;
        };
        if let Some(preview) = ctx.engine.preview.as_mut() {
            crate::preview::draw_rect(preview, line_roi(), Rgb([255, 255, 255]));
        }

        let now = ctx.msec();
        let measured = self.position(&frame);
        let current = ctx.game.objective.unwrap_or_default();
        let new_pos = measured.unwrap_or(current.pos);

        if (new_pos - current.pos).abs() > MAX_JUMP && self.last_update.matched_in(now) {
            tracing::debug!("Ignoring objective jump {} -> {}", current.pos, new_pos);
            return false;
        }

        let objective = ctx.game.objective.get_or_insert(ObjectivePosition::default());
        let moved = objective.pos != new_pos;
        objective.update(new_pos);
        if moved {
            events.emit(Event::ObjectivePositionUpdate {
                pos: objective.pos,
                min: objective.min,
                max: objective.max,
            });
        }

        self.last_update.record(now);
        true
    }

    fn reset(&mut self) {
        self.last_update.reset();
    }
}

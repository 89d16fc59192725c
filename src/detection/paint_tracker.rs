/// Paint score counter in the upper right corner of the HUD
///
/// Reads the player's inked turf while a match is running. The counter
/// only ever grows within a match, so a lower reading is treated as a
/// misread and dropped.
use image::Rgb;

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use crate::context::Context;
use crate::matcher::{Roi, REFERENCE_1080P};
use crate::messaging::Event;
use crate::ocr::{GlyphConstraints, TextReader};

pub const COUNTER_ROI: Roi = Roi::in_reference(1496, 52, 167, 67, REFERENCE_1080P);

/// Four or five digits, 50-60 px tall in the 1080p layout
pub fn counter_constraints() -> GlyphConstraints {
    GlyphConstraints::default()
        .glyph_count(4, 5)
        .glyph_height(50, 60)
}

pub struct PaintTracker {
    reader: Box<dyn TextReader>,
    constraints: GlyphConstraints,
}

impl PaintTracker {
    pub fn new(reader: Box<dyn TextReader>) -> Self {
        Self {
            reader,
            constraints: counter_constraints(),
        }
    }

    /// Counter value on the current frame
    pub fn read(&self, ctx: &Context) -> Option<u64> {
        let frame = ctx.frame_hd().or_else(|| ctx.frame())?;
        let crop = COUNTER_ROI.crop(frame)?;
        self.reader.read_digits(&crop, &self.constraints)
    }
}

impl Detector for PaintTracker {
    fn id(&self) -> SceneId {
        SceneId::PaintTracker
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        if let Some(preview) = ctx.engine.preview.as_mut() {
            crate::preview::draw_rect(preview, COUNTER_ROI, Rgb([255, 255, 255]));
        }
        // The counter is only on screen during a match
        if ctx.game.timer.is_none() {
            return false;
        }

        let Some(score) = self.read(ctx) else {
            return false;
        };
        if score > ctx.game.paint_score.unwrap_or(0) {
            tracing::debug!("Paint score {} at {} ms", score, ctx.msec());
            ctx.game.paint_score = Some(score);
            events.emit(Event::PaintScoreUpdate { score });
        }
        true
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TimerKind, TimerState};
    use crate::detection::test_support::*;
    use crate::ocr::GlyphClassifier;
    use image::RgbImage;
    use std::sync::Arc;

    /// 3x5 pixel font, one string per row
    const FONT: &[(char, [&str; 5])] = &[
        ('0', ["###", "#.#", "#.#", "#.#", "###"]),
        ('1', [".#.", "##.", ".#.", ".#.", ".#."]),
        ('4', ["#.#", "#.#", "###", "..#", "..#"]),
        ('7', ["###", "..#", ".#.", ".#.", ".#."]),
    ];
    const GAP: u32 = 8;

    /// 1080p frame with `digits` in the counter, `scale` px per font cell
    fn counter_frame(digits: &str, scale: u32) -> Arc<RgbImage> {
        let mut frame = RgbImage::from_pixel(REFERENCE_1080P.0, REFERENCE_1080P.1, BLACK);
        let mut left = COUNTER_ROI.x + 4;
        let top = COUNTER_ROI.y + 6;
        for ch in digits.chars() {
            let (_, rows) = FONT.iter().find(|(c, _)| *c == ch).unwrap();
            for (row, line) in rows.iter().enumerate() {
                for (col, cell) in line.chars().enumerate() {
                    if cell != '#' {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let x = left + col as u32 * scale + dx;
                            let y = top + row as u32 * scale + dy;
                            frame.put_pixel(x, y, WHITE);
                        }
                    }
                }
            }
            left += 3 * scale + GAP;
        }
        Arc::new(frame)
    }

    fn tracker() -> PaintTracker {
        let mut classifier = GlyphClassifier::new();
        let crop = COUNTER_ROI.crop(&counter_frame("0147", 11)).unwrap();
        assert_eq!(classifier.add_line("0147", &crop), 4);
        classifier.train().unwrap();
        PaintTracker::new(Box::new(classifier))
    }

    fn in_match(ctx: &mut Context, tick: u64, frame_hd: &Arc<RgbImage>) {
        context_with(ctx, tick, &Arc::new(blank_frame()));
        ctx.engine.frame_hd = Some(Arc::clone(frame_hd));
        ctx.game.timer = Some(TimerState {
            kind: TimerKind::Standard,
            remaining: "2:30".to_string(),
            detected_at_msec: 0,
        });
    }

    fn run(tracker: &mut PaintTracker, ctx: &mut Context) -> (bool, Vec<Event>) {
        let mut events = Emitter::new();
        let matched = tracker.detect(ctx, &SceneRegistry::new(), &mut events);
        (matched, events.drain())
    }

    #[test]
    fn test_reads_counter_digits() {
        let tracker = tracker();
        let mut ctx = Context::new();
        in_match(&mut ctx, 1, &counter_frame("1047", 11));
        assert_eq!(tracker.read(&ctx), Some(1047));
    }

    #[test]
    fn test_small_glyphs_are_not_the_counter() {
        let tracker = tracker();
        let mut ctx = Context::new();
        // 30 px tall digits fail the height constraint
        in_match(&mut ctx, 1, &counter_frame("1047", 6));
        assert_eq!(tracker.read(&ctx), None);
    }

    #[test]
    fn test_score_only_grows() {
        let mut tracker = tracker();
        let mut ctx = Context::new();

        in_match(&mut ctx, 1, &counter_frame("0147", 11));
        assert_eq!(run(&mut tracker, &mut ctx), (true, vec![Event::PaintScoreUpdate { score: 147 }]));
        assert_eq!(ctx.game.paint_score, Some(147));

        // Same value, then a lower misread
        assert_eq!(run(&mut tracker, &mut ctx), (true, Vec::new()));
        in_match(&mut ctx, 2, &counter_frame("0041", 11));
        assert_eq!(run(&mut tracker, &mut ctx), (true, Vec::new()));
        assert_eq!(ctx.game.paint_score, Some(147));

        in_match(&mut ctx, 3, &counter_frame("1407", 11));
        assert_eq!(run(&mut tracker, &mut ctx), (true, vec![Event::PaintScoreUpdate { score: 1407 }]));
        assert_eq!(ctx.game.paint_score, Some(1407));
    }

    #[test]
    fn test_idle_outside_a_match() {
        let mut tracker = tracker();
        let mut ctx = Context::new();
        in_match(&mut ctx, 1, &counter_frame("1047", 11));
        ctx.game.timer = None;

        assert_eq!(run(&mut tracker, &mut ctx), (false, Vec::new()));
        assert_eq!(ctx.game.paint_score, None);
    }
}

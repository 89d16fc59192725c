/// Match timer detector
///
/// ```text
/// Default ──(any reading)──> Pending ──(5 identical readings)──> Tracking
///    ▲                          │ different reading                │
///    └──────────────────────────┘                                  │
///    └──────────────(10 s without a valid reading: timer_reset)────┘
/// ```
///
/// Readings come from the high-resolution frame when the driver supplies
/// one, otherwise from the standard frame scaled up.
use image::{Rgb, RgbImage};
use regex::Regex;

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use super::state_machine::StateMachine;
use crate::context::{Context, TimerKind, TimerState};
use crate::matcher::{Roi, REFERENCE_1080P};
use crate::messaging::Event;
use crate::ocr::{GlyphConstraints, TextReader};
use crate::utils::Debouncer;

/// Identical readings required to accept a value
pub const CONFIRMATIONS: u32 = 5;
const LOST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerScene {
    Default,
    Pending,
    Tracking,
}

pub fn timer_roi(kind: TimerKind) -> Roi {
    match kind {
        TimerKind::Standard => Roi::in_reference(900, 48, 120, 53, REFERENCE_1080P),
        TimerKind::TriColor => Roi::in_reference(328, 43, 120, 53, REFERENCE_1080P),
    }
}

pub struct TimerDetector {
    fsm: StateMachine<TimerScene>,
    reader: Box<dyn TextReader>,
    pattern: Regex,
    kind: Option<TimerKind>,
    pending_value: Option<String>,
    pending_since_msec: u64,
    pending_left: u32,
    last_value: Option<String>,
    /// Liveness: any valid reading refreshes it
    reading_seen: Debouncer,
}

impl TimerDetector {
    pub fn new(reader: Box<dyn TextReader>) -> Result<Self, regex::Error> {
        Ok(Self {
            fsm: StateMachine::new("timer", TimerScene::Default),
            reader,
            pattern: Regex::new(r"^(\d).(\d{2})$")?,
            kind: None,
            pending_value: None,
            pending_since_msec: 0,
            pending_left: 0,
            last_value: None,
            reading_seen: Debouncer::new(LOST_TIMEOUT_MS),
        })
    }

    pub fn state(&self) -> TimerScene {
        self.fsm.state()
    }

    /// Normalize a raw OCR string to `m:ss`, rejecting impossible times
    pub fn normalize(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        let minutes: u32 = caps[1].parse().ok()?;
        let seconds: u32 = caps[2].parse().ok()?;
        if minutes > 5 || seconds > 59 {
            return None;
        }
        Some(format!("{}:{}", &caps[1], &caps[2]))
    }

    fn read(&self, ctx: &Context, kind: TimerKind) -> Option<String> {
        let frame = ctx.frame_hd().or_else(|| ctx.frame())?;
        let crop = timer_roi(kind).crop(frame)?;
        let text = self.reader.read_text(&crop, &GlyphConstraints::default())?;
        self.normalize(&text)
    }

    fn read_any(&self, ctx: &Context) -> Option<(TimerKind, String)> {
        [TimerKind::Standard, TimerKind::TriColor]
            .into_iter()
            .find_map(|kind| self.read(ctx, kind).map(|value| (kind, value)))
    }

    fn start_pending(&mut self, value: String, now: u64) {
        self.pending_value = Some(value);
        self.pending_since_msec = now;
        self.pending_left = CONFIRMATIONS - 1;
    }

    fn state_default(&mut self, ctx: &mut Context) -> bool {
        if let Some((kind, value)) = self.read_any(ctx) {
            tracing::debug!("Timer candidate {} ({})", value, kind.name());
            self.kind = Some(kind);
            self.start_pending(value, ctx.msec());
            self.fsm.switch_state(TimerScene::Pending);
        }
        false
    }

    fn state_pending(&mut self, ctx: &mut Context, kind: TimerKind, events: &mut Emitter) -> bool {
        let reading = self.read(ctx, kind);
        if reading.is_none() || reading != self.pending_value {
            self.reset();
            return false;
        }

        self.pending_left = self.pending_left.saturating_sub(1);
        if self.pending_left > 0 {
            return false;
        }

        let Some(value) = reading else {
            return false;
        };
        let now = ctx.msec();
        self.reading_seen.record(now);
        ctx.game.timer = Some(TimerState {
            kind,
            remaining: value.clone(),
            detected_at_msec: self.pending_since_msec,
        });
        events.emit(Event::TimerDetected {
            kind,
            remaining: value,
            first_seen_msec: self.pending_since_msec,
        });
        self.fsm.switch_state(TimerScene::Tracking);
        true
    }

    fn state_tracking(&mut self, ctx: &mut Context, kind: TimerKind, events: &mut Emitter) -> bool {
        let now = ctx.msec();
        let reading = self.read(ctx, kind);

        if let Some(value) = &reading {
            self.reading_seen.record(now);
            if Some(value) == self.last_value.as_ref() {
                return true;
            }

            if Some(value) == self.pending_value.as_ref() {
                self.pending_left = self.pending_left.saturating_sub(1);
            } else {
                self.start_pending(value.clone(), now);
            }

            if self.pending_left == 0 {
                self.last_value = Some(value.clone());
                if let Some(timer) = ctx.game.timer.as_mut() {
                    timer.remaining = value.clone();
                }
                events.emit(Event::TimerUpdate {
                    remaining: value.clone(),
                    first_seen_msec: self.pending_since_msec,
                });
            }
        }

        if !self.reading_seen.matched_in(now) {
            tracing::info!("Timer lost for {} ms, resetting", LOST_TIMEOUT_MS);
            events.emit(Event::TimerReset);
            self.reset();
            return false;
        }

        reading.is_some()
    }

    fn draw_preview(&self, preview: &mut RgbImage) {
        for kind in [TimerKind::Standard, TimerKind::TriColor] {
            let color = if Some(kind) == self.kind {
                Rgb([255, 0, 0])
            } else {
                Rgb([128, 0, 0])
            };
            crate::preview::draw_rect(preview, timer_roi(kind), color);
        }
    }
}

impl Detector for TimerDetector {
    fn id(&self) -> SceneId {
        SceneId::Timer
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        let state = self.fsm.begin_tick(ctx.msec());
        if ctx.frame().is_none() && ctx.frame_hd().is_none() {
            return false;
        }

        if let Some(preview) = ctx.engine.preview.as_mut() {
            self.draw_preview(preview);
        }

        match (state, self.kind) {
            (TimerScene::Default, _) => self.state_default(ctx),
            (TimerScene::Pending, Some(kind)) => self.state_pending(ctx, kind, events),
            (TimerScene::Tracking, Some(kind)) => self.state_tracking(ctx, kind, events),
            // Layout is always known outside Default
            (_, None) => {
                self.reset();
                false
            }
        }
    }

    fn reset(&mut self) {
        self.fsm.reset();
        self.kind = None;
        self.pending_value = None;
        self.pending_since_msec = 0;
        self.pending_left = 0;
        self.last_value = None;
        self.reading_seen.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Reads the text keyed by the red channel of the crop's first pixel
    struct ScriptedReader(HashMap<u8, &'static str>);

    impl TextReader for ScriptedReader {
        fn read_text(&self, image: &RgbImage, _constraints: &GlyphConstraints) -> Option<String> {
            let code = image.get_pixel(0, 0)[0];
            self.0.get(&code).map(|text| text.to_string())
        }
    }

    const NOTHING: u8 = 0;
    const THREE_MINUTES: u8 = 1;
    const TWO_59: u8 = 2;
    const IMPOSSIBLE: u8 = 3;
    const DOTTED: u8 = 4;

    fn detector() -> TimerDetector {
        let reader = ScriptedReader(HashMap::from([
            (THREE_MINUTES, "3:00"),
            (TWO_59, "2:59"),
            (IMPOSSIBLE, "9:99"),
            (DOTTED, "3.00"),
        ]));
        TimerDetector::new(Box::new(reader)).unwrap()
    }

    fn frame(code: u8) -> Arc<RgbImage> {
        Arc::new(RgbImage::from_pixel(1280, 720, Rgb([code, 0, 0])))
    }

    struct Run {
        detector: TimerDetector,
        ctx: Context,
        registry: SceneRegistry,
        events: Vec<Event>,
    }

    impl Run {
        fn new() -> Self {
            Self {
                detector: detector(),
                ctx: Context::new(),
                registry: SceneRegistry::new(),
                events: Vec::new(),
            }
        }

        fn feed(&mut self, tick: u64, code: u8) {
            self.ctx.engine.tick = tick;
            self.ctx.engine.msec = tick * 100;
            self.ctx.engine.frame = Some(frame(code));
            let mut emitter = Emitter::new();
            self.detector.detect(&mut self.ctx, &self.registry, &mut emitter);
            self.events.extend(emitter.drain());
        }
    }

    #[test]
    fn test_normalize() {
        let detector = detector();
        assert_eq!(detector.normalize("3:00").as_deref(), Some("3:00"));
        assert_eq!(detector.normalize("4.59").as_deref(), Some("4:59"));
        assert_eq!(detector.normalize("6:00"), None);
        assert_eq!(detector.normalize("3:60"), None);
        assert_eq!(detector.normalize("13:00"), None);
        assert_eq!(detector.normalize("300"), None);
    }

    #[test]
    fn test_five_identical_readings_accept_value() {
        let mut run = Run::new();
        for tick in 1..=5 {
            run.feed(tick, THREE_MINUTES);
        }

        assert_eq!(
            run.events,
            vec![Event::TimerDetected {
                kind: TimerKind::Standard,
                remaining: "3:00".to_string(),
                first_seen_msec: 100,
            }]
        );
        assert_eq!(run.detector.fsm.pending(), Some(TimerScene::Tracking));
        assert_eq!(run.ctx.game.timer.as_ref().map(|t| t.remaining.as_str()), Some("3:00"));

        run.feed(6, THREE_MINUTES);
        assert_eq!(run.detector.state(), TimerScene::Tracking);
    }

    #[test]
    fn test_four_identical_then_different_rejects() {
        let mut run = Run::new();
        for tick in 1..=4 {
            run.feed(tick, THREE_MINUTES);
        }
        run.feed(5, TWO_59);

        assert!(run.events.is_empty());
        assert_eq!(run.detector.state(), TimerScene::Default);
    }

    #[test]
    fn test_invalid_readings_never_start_pending() {
        let mut run = Run::new();
        for tick in 1..=10 {
            run.feed(tick, IMPOSSIBLE);
        }
        run.feed(11, NOTHING);

        assert!(run.events.is_empty());
        assert_eq!(run.detector.state(), TimerScene::Default);
    }

    #[test]
    fn test_separator_is_normalized() {
        let mut run = Run::new();
        for tick in 1..=5 {
            run.feed(tick, DOTTED);
        }
        assert!(matches!(
            run.events.as_slice(),
            [Event::TimerDetected { remaining, .. }] if remaining == "3:00"
        ));
    }

    #[test]
    fn test_tracking_updates_after_confirmation() {
        let mut run = Run::new();
        for tick in 1..=5 {
            run.feed(tick, THREE_MINUTES);
        }
        // First tracking tick confirms the accepted value right away
        run.feed(6, THREE_MINUTES);
        assert_eq!(
            run.events.last(),
            Some(&Event::TimerUpdate {
                remaining: "3:00".to_string(),
                first_seen_msec: 100,
            })
        );

        for tick in 7..=10 {
            run.feed(tick, TWO_59);
        }
        assert_eq!(run.events.len(), 2);

        run.feed(11, TWO_59);
        assert_eq!(
            run.events.last(),
            Some(&Event::TimerUpdate {
                remaining: "2:59".to_string(),
                first_seen_msec: 700,
            })
        );
        assert_eq!(run.ctx.game.timer.as_ref().map(|t| t.remaining.as_str()), Some("2:59"));
    }

    #[test]
    fn test_reset_after_ten_seconds_without_reading() {
        let mut run = Run::new();
        for tick in 1..=6 {
            run.feed(tick, THREE_MINUTES);
        }
        let before = run.events.len();

        // Last valid reading at 600 ms
        for tick in 7..106 {
            run.feed(tick, NOTHING);
            assert_eq!(run.detector.state(), TimerScene::Tracking, "tick {}", tick);
        }
        assert_eq!(run.events.len(), before);

        run.feed(106, NOTHING);
        assert_eq!(run.events.last(), Some(&Event::TimerReset));
        assert_eq!(run.detector.state(), TimerScene::Default);
    }

    #[test]
    fn test_prefers_high_resolution_frame() {
        let mut run = Run::new();
        for tick in 1..=5 {
            run.ctx.engine.frame_hd = Some(Arc::new(RgbImage::from_pixel(1920, 1080, Rgb([THREE_MINUTES, 0, 0]))));
            run.feed(tick, NOTHING);
        }
        assert_eq!(run.events.len(), 1);
    }

    #[test]
    fn test_tricolor_layout() {
        let mut run = Run::new();
        let mut hd = RgbImage::new(1920, 1080);
        let roi = timer_roi(TimerKind::TriColor);
        for y in roi.y..roi.y + roi.height {
            for x in roi.x..roi.x + roi.width {
                hd.put_pixel(x, y, Rgb([TWO_59, 0, 0]));
            }
        }
        run.ctx.engine.frame_hd = Some(Arc::new(hd));

        for tick in 1..=5 {
            run.feed(tick, NOTHING);
        }
        assert!(matches!(
            run.events.as_slice(),
            [Event::TimerDetected { kind: TimerKind::TriColor, .. }]
        ));
    }
}

/// "GO!" start signal
use image::Rgb;

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use crate::assets::MaskAssets;
use crate::context::Context;
use crate::error::AssetError;
use crate::matcher::{MatcherSpec, PixelClass, RegionMatcher, Roi};
use crate::messaging::Event;
use crate::utils::Debouncer;

const COOLDOWN_MS: u64 = 60_000;
/// The signal is only expected shortly after the match begins
const BEGINNING_WINDOW_MS: u64 = 60_000;

pub const GO_SIGN_MASK: &str = "v2_game_go_sign.png";

pub fn go_sign_spec() -> MatcherSpec {
    MatcherSpec {
        label: "go_sign",
        roi: Roi::new(384, 130, 478, 207),
        mask_file: GO_SIGN_MASK,
        threshold: 0.95,
        orig_threshold: 0.05,
        fg: PixelClass::white(),
        bg: Some(PixelClass::not_white()),
    }
}

pub struct GoSignDetector {
    matcher: RegionMatcher,
    fired: Debouncer,
    beginning_seen: Debouncer,
}

impl GoSignDetector {
    pub fn new(assets: &MaskAssets) -> Result<Self, AssetError> {
        Ok(Self {
            matcher: RegionMatcher::from_spec(&go_sign_spec(), assets)?,
            fired: Debouncer::new(COOLDOWN_MS),
            beginning_seen: Debouncer::new(BEGINNING_WINDOW_MS),
        })
    }
}

impl Detector for GoSignDetector {
    fn id(&self) -> SceneId {
        SceneId::GoSign
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        let now = ctx.msec();
        if self.fired.matched_in(now) || !self.beginning_seen.matched_in(now) {
            return false;
        }
        let Some(frame) = ctx.engine.frame.clone() else {
            return false;
        };

        if let Some(preview) = ctx.engine.preview.as_mut() {
            self.matcher.draw_roi(preview, Rgb([0, 255, 0]));
        }

        if !self.matcher.matches(&frame) {
            return false;
        }

        ctx.game.start_offset_msec = Some(now);
        events.emit(Event::GameGoSign {
            start_offset_msec: now,
        });
        self.fired.record(now);
        self.beginning_seen.reset();
        true
    }

    fn on_event(&mut self, ctx: &mut Context, event: &Event, _events: &mut Emitter) {
        if *event == Event::GameBeginning {
            self.beginning_seen.record(ctx.msec());
        }
    }

    fn reset(&mut self) {
        self.fired.reset();
        self.beginning_seen.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::*;
    use image::RgbImage;
    use std::sync::Arc;

    struct Harness {
        detector: GoSignDetector,
        ctx: Context,
        go: Arc<RgbImage>,
    }

    impl Harness {
        fn new() -> Self {
            let assets = assets_for(&[go_sign_spec()]);
            let mut go = blank_frame();
            paint(&mut go, &go_sign_spec(), &assets, WHITE, BLACK);
            Self {
                detector: GoSignDetector::new(&assets).unwrap(),
                ctx: Context::new(),
                go: Arc::new(go),
            }
        }

        fn tick(&mut self, tick: u64, frame: &Arc<RgbImage>) -> Vec<Event> {
            context_with(&mut self.ctx, tick, frame);
            let mut events = Emitter::new();
            self.detector.detect(&mut self.ctx, &SceneRegistry::new(), &mut events);
            events.drain()
        }

        fn begin(&mut self) {
            self.detector
                .on_event(&mut self.ctx, &Event::GameBeginning, &mut Emitter::new());
        }
    }

    #[test]
    fn test_requires_recent_beginning() {
        let mut h = Harness::new();
        let go = Arc::clone(&h.go);
        assert!(h.tick(1, &go).is_empty());

        h.begin();
        assert_eq!(
            h.tick(2, &go),
            vec![Event::GameGoSign {
                start_offset_msec: 200
            }]
        );
        assert_eq!(h.ctx.game.start_offset_msec, Some(200));
    }

    #[test]
    fn test_fires_once_per_beginning() {
        let mut h = Harness::new();
        let go = Arc::clone(&h.go);
        h.ctx.engine.msec = 100;
        h.begin();

        assert_eq!(h.tick(1, &go).len(), 1);
        for tick in 2..20 {
            assert!(h.tick(tick, &go).is_empty());
        }
    }

    #[test]
    fn test_stale_beginning_expires() {
        let mut h = Harness::new();
        let go = Arc::clone(&h.go);
        h.ctx.engine.msec = 100;
        h.begin();

        // 60 s after the beginning at 100 ms
        assert!(h.tick(601, &go).is_empty());
    }

    #[test]
    fn test_blank_frame_does_not_match() {
        let mut h = Harness::new();
        let blank = Arc::new(blank_frame());
        h.begin();
        assert!(h.tick(1, &blank).is_empty());
        assert_eq!(h.ctx.game.start_offset_msec, None);
    }
}

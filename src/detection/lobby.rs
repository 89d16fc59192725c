/// Lobby / matchmaking detector
///
/// ```text
/// Default ──(HUD + rule + matching)──> Matching ──(matched)──> Matched
///    │                                   │ 10 s without banner: canceled
///    └──(HUD + rule)──> LeftQueue        │
///                          3 s without HUD: back to Default
/// ```
use image::{Rgb, RgbImage};

use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use super::state_machine::StateMachine;
use crate::assets::MaskAssets;
use crate::context::{Context, LobbyPhase, Rule};
use crate::error::AssetError;
use crate::matcher::{MatcherSpec, PixelClass, RegionMatcher, Roi};
use crate::messaging::Event;
use crate::utils::Debouncer;

const LEFT_QUEUE_TIMEOUT_MS: u64 = 3_000;
const MATCHING_TIMEOUT_MS: u64 = 10_000;
const MATCHED_TIMEOUT_MS: u64 = 10_000;

pub const YELLOW_HUD_MASK: &str = "v3_scorebaord_yellow.png";
pub const MATCHING_MASK: &str = "v3_lobby_matchmaking.png";
pub const MATCHED_MASK: &str = "v3_lobby_matched.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyScene {
    Default,
    LeftQueue,
    Matching,
    Matched,
}

fn rule_mask_file(rule: Rule) -> &'static str {
    match rule {
        Rule::TurfWar => "v3_lobby_nawabari.png",
        Rule::SplatZones => "v3_lobby_area.png",
        Rule::TowerControl => "v3_lobby_yagura.png",
        Rule::Rainmaker => "v3_lobby_hoko.png",
        Rule::ClamBlitz => "v3_lobby_asari.png",
    }
}

fn rule_label(rule: Rule) -> &'static str {
    match rule {
        Rule::TurfWar => "lobby_nawabari",
        Rule::SplatZones => "lobby_area",
        Rule::TowerControl => "lobby_yagura",
        Rule::Rainmaker => "lobby_hoko",
        Rule::ClamBlitz => "lobby_asari",
    }
}

/// Yellow button in the lower right corner of the lobby HUD
pub fn yellow_hud_spec() -> MatcherSpec {
    let yellow = PixelClass::hue((30, 35), (230, 255));
    MatcherSpec {
        label: "yellow_button",
        roi: Roi::new(1174, 660, 83, 40),
        mask_file: YELLOW_HUD_MASK,
        threshold: 0.90,
        orig_threshold: 0.60,
        fg: yellow.clone(),
        bg: Some(yellow),
    }
}

pub fn matching_spec() -> MatcherSpec {
    MatcherSpec {
        label: "lobby_matchmaking",
        roi: Roi::new(41, 35, 127, 25),
        mask_file: MATCHING_MASK,
        threshold: 0.95,
        orig_threshold: 0.3,
        fg: PixelClass::white(),
        bg: Some(PixelClass::dark()),
    }
}

pub fn matched_spec() -> MatcherSpec {
    MatcherSpec {
        label: "lobby_matched",
        roi: Roi::new(539, 368, 200, 36),
        mask_file: MATCHED_MASK,
        threshold: 0.95,
        orig_threshold: 0.3,
        fg: PixelClass::white(),
        bg: Some(PixelClass::dark()),
    }
}

pub fn rule_spec(rule: Rule) -> MatcherSpec {
    MatcherSpec {
        label: rule_label(rule),
        roi: Roi::new(553, 59, 134, 25),
        mask_file: rule_mask_file(rule),
        threshold: 0.93,
        orig_threshold: 0.3,
        fg: PixelClass::white(),
        bg: Some(PixelClass::black()),
    }
}

pub struct LobbyDetector {
    fsm: StateMachine<LobbyScene>,
    yellow_hud: RegionMatcher,
    matching: RegionMatcher,
    matched: RegionMatcher,
    rules: Vec<(Rule, RegionMatcher)>,
    /// Liveness windows, refreshed while the guarding banner is visible
    queue_seen: Debouncer,
    matching_seen: Debouncer,
    matched_seen: Debouncer,
}

impl LobbyDetector {
    pub fn new(assets: &MaskAssets) -> Result<Self, AssetError> {
        let rules = Rule::ALL
            .iter()
            .map(|&rule| Ok((rule, RegionMatcher::from_spec(&rule_spec(rule), assets)?)))
            .collect::<Result<Vec<_>, AssetError>>()?;

        Ok(Self {
            fsm: StateMachine::new("lobby", LobbyScene::Default),
            yellow_hud: RegionMatcher::from_spec(&yellow_hud_spec(), assets)?,
            matching: RegionMatcher::from_spec(&matching_spec(), assets)?,
            matched: RegionMatcher::from_spec(&matched_spec(), assets)?,
            rules,
            queue_seen: Debouncer::new(LEFT_QUEUE_TIMEOUT_MS),
            matching_seen: Debouncer::new(MATCHING_TIMEOUT_MS),
            matched_seen: Debouncer::new(MATCHED_TIMEOUT_MS),
        })
    }

    pub fn state(&self) -> LobbyScene {
        self.fsm.state()
    }

    fn detect_rule(&self, frame: &RgbImage) -> Option<Rule> {
        self.rules
            .iter()
            .find(|(_, matcher)| matcher.matches(frame))
            .map(|(rule, _)| *rule)
    }

    fn back_to_default(&mut self, ctx: &mut Context) {
        self.reset();
        ctx.lobby.enter(LobbyPhase::Idle, ctx.engine.msec);
    }

    fn state_default(&mut self, ctx: &mut Context, frame: &RgbImage, events: &mut Emitter) -> bool {
        let now = ctx.msec();
        let hud = self.yellow_hud.matches(frame);
        let matching = self.matching.matches(frame);
        let rule = if hud { self.detect_rule(frame) } else { None };

        let Some(rule) = rule else {
            return false;
        };
        ctx.lobby.rule = Some(rule);

        if matching {
            ctx.lobby.enter(LobbyPhase::Matching, now);
            self.matching_seen.record(now);
            events.emit(Event::LobbyMatching { rule: Some(rule) });
            self.fsm.switch_state(LobbyScene::Matching);
        } else {
            ctx.lobby.enter(LobbyPhase::LeftQueue, now);
            self.queue_seen.record(now);
            events.emit(Event::LobbyLeftQueue);
            self.fsm.switch_state(LobbyScene::LeftQueue);
        }
        false
    }

    fn state_left_queue(&mut self, ctx: &mut Context, frame: &RgbImage) -> bool {
        let now = ctx.msec();
        if self.yellow_hud.matches(frame) {
            self.queue_seen.record(now);
            return true;
        }
        if !self.queue_seen.matched_in(now) {
            self.back_to_default(ctx);
        }
        false
    }

    fn state_matching(&mut self, ctx: &mut Context, frame: &RgbImage, events: &mut Emitter) -> bool {
        let now = ctx.msec();
        if self.matching.matches(frame) {
            self.matching_seen.record(now);
            return true;
        }

        if !self.matching_seen.matched_in(now) {
            tracing::info!("Lost in matchmaking, resetting lobby state");
            events.emit(Event::LobbyMatchingCanceled);
            self.back_to_default(ctx);
            return false;
        }

        if self.matched.matches(frame) {
            ctx.lobby.enter(LobbyPhase::Matched, now);
            self.matched_seen.record(now);
            events.emit(Event::LobbyMatched {
                rule: ctx.lobby.rule,
            });
            self.fsm.switch_state(LobbyScene::Matched);
        }
        false
    }

    fn state_matched(&mut self, ctx: &mut Context, frame: &RgbImage) -> bool {
        let now = ctx.msec();
        if self.matched.matches(frame) {
            self.matched_seen.record(now);
            return true;
        }
        if !self.matched_seen.matched_in(now) {
            tracing::info!("Timeout after matched, resetting lobby state");
            self.back_to_default(ctx);
        }
        false
    }

    fn draw_preview(&self, preview: &mut RgbImage) {
        let color = Rgb([255, 255, 0]);
        self.yellow_hud.draw_roi(preview, color);
        self.matching.draw_roi(preview, color);
        self.matched.draw_roi(preview, color);
        if let Some((_, rule)) = self.rules.first() {
            rule.draw_roi(preview, color);
        }
    }
}

impl Detector for LobbyDetector {
    fn id(&self) -> SceneId {
        SceneId::Lobby
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, events: &mut Emitter) -> bool {
        let state = self.fsm.begin_tick(ctx.msec());
        let Some(frame) = ctx.engine.frame.clone() else {
            return false;
        };

        if let Some(preview) = ctx.engine.preview.as_mut() {
            self.draw_preview(preview);
        }

        match state {
            LobbyScene::Default => self.state_default(ctx, &frame, events),
            LobbyScene::LeftQueue => self.state_left_queue(ctx, &frame),
            LobbyScene::Matching => self.state_matching(ctx, &frame, events),
            LobbyScene::Matched => self.state_matched(ctx, &frame),
        }
    }

    fn reset(&mut self) {
        self.fsm.reset();
        self.queue_seen.reset();
        self.matching_seen.reset();
        self.matched_seen.reset();
    }
}

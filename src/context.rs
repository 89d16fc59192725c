/// Per-tick context threaded through every detector
///
/// Three typed namespaces replace a loosely keyed map:
/// - `EngineTick`: the frame(s) and logical time of the current tick
/// - `GameState`: match state filled in progressively, cleared per match
/// - `LobbyState`: matchmaking phase, with its own lifecycle
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Immutable frame shared between the driver and every detector
pub type Frame = Arc<RgbImage>;

#[derive(Debug, Clone, Default)]
pub struct EngineTick {
    /// Monotonic tick counter, starts at 1 for the first frame
    pub tick: u64,
    /// Standard frame (reference layout 1280x720)
    pub frame: Option<Frame>,
    /// Optional high-resolution frame (1920x1080) for fine OCR
    pub frame_hd: Option<Frame>,
    /// Debug canvas detectors may draw on
    pub preview: Option<RgbImage>,
    /// Logical milliseconds since stream start
    pub msec: u64,
}

/// Game modes the lobby and HUD detectors can tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    TurfWar,
    SplatZones,
    TowerControl,
    Rainmaker,
    ClamBlitz,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::TurfWar,
        Rule::SplatZones,
        Rule::TowerControl,
        Rule::Rainmaker,
        Rule::ClamBlitz,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Rule::TurfWar => "nawabari",
            Rule::SplatZones => "area",
            Rule::TowerControl => "yagura",
            Rule::Rainmaker => "hoko",
            Rule::ClamBlitz => "asari",
        }
    }

    /// Rules with a single moving objective on a progress line
    pub fn has_objective_track(&self) -> bool {
        matches!(self, Rule::TowerControl | Rule::Rainmaker)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rule::TurfWar => "Turf War",
            Rule::SplatZones => "Splat Zones",
            Rule::TowerControl => "Tower Control",
            Rule::Rainmaker => "Rainmaker",
            Rule::ClamBlitz => "Clam Blitz",
        };
        write!(f, "{}", name)
    }
}

/// Marker position on the objective line, in percent of each half
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectivePosition {
    pub pos: i32,
    pub min: i32,
    pub max: i32,
}

impl ObjectivePosition {
    pub fn new(pos: i32) -> Self {
        Self { pos, min: pos, max: pos }
    }

    /// Move the marker; min and max only ever widen
    pub fn update(&mut self, pos: i32) {
        self.pos = pos;
        self.min = self.min.min(pos);
        self.max = self.max.max(pos);
    }
}

/// Which timer layout was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    Standard,
    TriColor,
}

impl TimerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TimerKind::Standard => "default",
            TimerKind::TriColor => "tricolor",
        }
    }
}

/// Remaining match time as shown on the HUD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub kind: TimerKind,
    /// Normalized `m:ss`
    pub remaining: String,
    pub detected_at_msec: u64,
}

/// Dominant hue of one team, OpenCV hue scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamColor {
    pub hue: u8,
    pub rgb: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub team: u8,
    pub name: Option<String>,
    pub weapon: Option<String>,
    pub kills: Option<u32>,
    pub deaths: Option<u32>,
}

/// Accumulated state of the match in progress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameState {
    pub map: Option<String>,
    pub rule: Option<Rule>,
    pub players: Vec<Player>,
    pub objective: Option<ObjectivePosition>,
    pub timer: Option<TimerState>,
    pub team_colors: Option<[TeamColor; 2]>,
    /// Turf inked by the player, as shown on the HUD counter
    pub paint_score: Option<u64>,
    /// Stream time of the start signal
    pub start_offset_msec: Option<u64>,
    pub finish_msec: Option<u64>,
    pub won: Option<bool>,
    pub kills: Option<u32>,
    pub deaths: Option<u32>,
}

impl GameState {
    pub fn clear(&mut self) {
        *self = GameState::default();
    }
}

/// Matchmaking phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LobbyPhase {
    #[default]
    Idle,
    LeftQueue,
    Matching,
    Matched,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyState {
    pub phase: LobbyPhase,
    pub rule: Option<Rule>,
    pub phase_entered_msec: Option<u64>,
}

impl LobbyState {
    pub fn enter(&mut self, phase: LobbyPhase, msec: u64) {
        self.phase = phase;
        self.phase_entered_msec = Some(msec);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    pub engine: EngineTick,
    pub game: GameState,
    pub lobby: LobbyState,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msec(&self) -> u64 {
        self.engine.msec
    }

    pub fn tick(&self) -> u64 {
        self.engine.tick
    }

    pub fn frame(&self) -> Option<&RgbImage> {
        self.engine.frame.as_deref()
    }

    pub fn frame_hd(&self) -> Option<&RgbImage> {
        self.engine.frame_hd.as_deref()
    }
}

/// Event types raised by detectors
///
/// Events represent things that have happened (past tense). The set is
/// closed: listeners match on the variants they care about and ignore the
/// rest.
use crate::context::{Rule, TeamColor, TimerKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The rule banner disappeared without matchmaking starting
    LobbyLeftQueue,

    /// Matchmaking started
    LobbyMatching { rule: Option<Rule> },

    /// Matchmaking gave up
    LobbyMatchingCanceled,

    /// A match was found
    LobbyMatched { rule: Option<Rule> },

    /// The match timer was read consistently for the first time
    TimerDetected {
        kind: TimerKind,
        remaining: String,
        /// Stream time of the first reading of the accepted value
        first_seen_msec: u64,
    },

    /// The match timer changed to a new confirmed value
    TimerUpdate {
        remaining: String,
        first_seen_msec: u64,
    },

    /// The timer has not been readable for too long
    TimerReset,

    /// The match started with its full time on the clock
    GameBeginning,

    /// The "GO!" start signal was shown
    GameGoSign { start_offset_msec: u64 },

    /// The objective marker moved
    ObjectivePositionUpdate { pos: i32, min: i32, max: i32 },

    TeamColorsDetected { colors: [TeamColor; 2] },

    /// The finish banner was shown
    GameFinish,

    /// The player's paint counter went up
    PaintScoreUpdate { score: u64 },
}

impl Event {
    /// Stable snake_case name, used in logs and by external integrations
    pub fn name(&self) -> &'static str {
        match self {
            Event::LobbyLeftQueue => "lobby_left_queue",
            Event::LobbyMatching { .. } => "lobby_matching",
            Event::LobbyMatchingCanceled => "lobby_matching_canceled",
            Event::LobbyMatched { .. } => "lobby_matched",
            Event::TimerDetected { .. } => "timer_detected",
            Event::TimerUpdate { .. } => "timer_update",
            Event::TimerReset => "timer_reset",
            Event::GameBeginning => "game_beginning",
            Event::GameGoSign { .. } => "game_go_sign",
            Event::ObjectivePositionUpdate { .. } => "objective_position_update",
            Event::TeamColorsDetected { .. } => "team_colors_detected",
            Event::GameFinish => "game_finish",
            Event::PaintScoreUpdate { .. } => "game_paint_score_update",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        let rule_name = |rule: &Option<Rule>| match rule {
            Some(rule) => rule.to_string(),
            None => "unknown rule".to_string(),
        };

        match self {
            Event::LobbyLeftQueue => "Left the matchmaking queue".to_string(),
            Event::LobbyMatching { rule } => format!("Matchmaking ({})", rule_name(rule)),
            Event::LobbyMatchingCanceled => "Matchmaking canceled".to_string(),
            Event::LobbyMatched { rule } => format!("Match found ({})", rule_name(rule)),
            Event::TimerDetected { kind, remaining, .. } => {
                format!("Timer detected: {} ({})", remaining, kind.name())
            }
            Event::TimerUpdate { remaining, .. } => format!("Timer: {}", remaining),
            Event::TimerReset => "Timer lost".to_string(),
            Event::GameBeginning => "Match beginning".to_string(),
            Event::GameGoSign { start_offset_msec } => {
                format!("GO! at {} ms", start_offset_msec)
            }
            Event::ObjectivePositionUpdate { pos, min, max } => {
                format!("Objective at {} (min {}, max {})", pos, min, max)
            }
            Event::TeamColorsDetected { colors } => {
                format!("Team colors: hue {} vs {}", colors[0].hue, colors[1].hue)
            }
            Event::GameFinish => "Match finished".to_string(),
            Event::PaintScoreUpdate { score } => format!("Paint score: {}p", score),
        }
    }
}

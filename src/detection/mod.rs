/// Detection module
///
/// ## Architecture
///
/// ```text
/// Engine
///   └── Scene (per-tick cache)
///       └── Detector
///           ├── LobbyDetector      (FSM)
///           ├── TimerDetector      (FSM, glyph OCR)
///           ├── BeginningDetector  (FSM, event driven)
///           ├── GoSignDetector
///           ├── ObjectiveTracker   (depends on Lobby)
///           ├── TeamColorsDetector (FSM, event driven)
///           ├── FinishDetector     (FSM)
///           └── PaintTracker       (glyph OCR, needs a running timer)
/// ```
///
/// Detectors are registered in dependency order; a detector reads the
/// results of the ones before it through `SceneRegistry`.
pub mod beginning;
pub mod finish;
pub mod go_sign;
pub mod lobby;
pub mod objective;
pub mod paint_tracker;
pub mod scene;
pub mod state_machine;
pub mod team_colors;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::Context as _;

use crate::assets::MaskAssets;
use crate::config::DetectorToggles;
use crate::error::AppResult;
use crate::ocr::TextReader;

// Re-export commonly used types
pub use beginning::{BeginningDetector, BeginningScene};
pub use finish::{FinishDetector, FinishScene};
pub use go_sign::GoSignDetector;
pub use lobby::{LobbyDetector, LobbyScene};
pub use objective::ObjectiveTracker;
pub use paint_tracker::PaintTracker;
pub use scene::{Detector, Emitter, Scene, SceneId, SceneRegistry};
pub use state_machine::StateMachine;
pub use team_colors::{TeamColorsDetector, TeamColorsScene};
pub use timer::{TimerDetector, TimerScene};

/// Trained glyph models for the OCR detectors
#[derive(Default)]
pub struct Readers {
    pub timer: Option<Box<dyn TextReader>>,
    pub paint: Option<Box<dyn TextReader>>,
}

/// Build the enabled detectors in the default registration order.
///
/// Each OCR detector that is enabled needs its reader in `readers`.
pub fn build_default_detectors(
    toggles: &DetectorToggles,
    assets: &MaskAssets,
    readers: Readers,
) -> AppResult<Vec<Box<dyn Detector>>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();

    if toggles.lobby {
        detectors.push(Box::new(
            LobbyDetector::new(assets).context("Failed to set up the lobby detector")?,
        ));
    }
    if toggles.timer {
        let reader = readers.timer.context("The timer detector needs a trained glyph model")?;
        detectors.push(Box::new(
            TimerDetector::new(reader).context("Failed to set up the timer detector")?,
        ));
    }
    if toggles.beginning {
        detectors.push(Box::new(BeginningDetector::new()));
    }
    if toggles.go_sign {
        detectors.push(Box::new(
            GoSignDetector::new(assets).context("Failed to set up the go sign detector")?,
        ));
    }
    if toggles.objective {
        detectors.push(Box::new(
            ObjectiveTracker::new(assets).context("Failed to set up the objective tracker")?,
        ));
    }
    if toggles.team_colors {
        detectors.push(Box::new(
            TeamColorsDetector::new(assets).context("Failed to set up the team colors detector")?,
        ));
    }
    if toggles.finish {
        detectors.push(Box::new(
            FinishDetector::new(assets).context("Failed to set up the finish detector")?,
        ));
    }
    if toggles.paint_tracker {
        let reader = readers
            .paint
            .context("The paint tracker needs a trained glyph model")?;
        detectors.push(Box::new(PaintTracker::new(reader)));
    }

    tracing::info!(
        "Built {} detectors: {}",
        detectors.len(),
        detectors.iter().map(|d| d.id().name()).collect::<Vec<_>>().join(", ")
    );
    Ok(detectors)
}

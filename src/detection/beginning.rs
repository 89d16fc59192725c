/// Match beginning detector
///
/// Purely event driven: a freshly detected timer whose first confirmed
/// value is the full match length means the match is just starting.
use super::scene::{Detector, Emitter, SceneId, SceneRegistry};
use super::state_machine::StateMachine;
use crate::context::Context;
use crate::messaging::Event;

/// Full match lengths shown on the clock at the start
const FULL_MATCH_TIMES: [&str; 2] = ["3:00", "5:00"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginningScene {
    Default,
    Waiting,
    WaitForTimeout,
}

pub struct BeginningDetector {
    fsm: StateMachine<BeginningScene>,
}

impl BeginningDetector {
    pub fn new() -> Self {
        Self {
            fsm: StateMachine::new("beginning", BeginningScene::Default),
        }
    }

    pub fn state(&self) -> BeginningScene {
        self.fsm.state()
    }

    /// State the machine will be in once pending switches apply
    fn effective_state(&self) -> BeginningScene {
        self.fsm.pending().unwrap_or_else(|| self.fsm.state())
    }
}

impl Default for BeginningDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for BeginningDetector {
    fn id(&self) -> SceneId {
        SceneId::Beginning
    }

    fn detect(&mut self, ctx: &mut Context, _scenes: &SceneRegistry, _events: &mut Emitter) -> bool {
        self.fsm.begin_tick(ctx.msec());
        false
    }

    fn on_event(&mut self, _ctx: &mut Context, event: &Event, events: &mut Emitter) {
        match event {
            Event::TimerDetected { .. } => {
                self.fsm.switch_state(BeginningScene::Waiting);
            }
            Event::TimerUpdate { remaining, .. } => {
                if self.effective_state() != BeginningScene::Waiting {
                    return;
                }
                if FULL_MATCH_TIMES.contains(&remaining.as_str()) {
                    tracing::info!("Match beginning ({} on the clock)", remaining);
                    events.emit(Event::GameBeginning);
                } else {
                    tracing::debug!("Joined a match already running ({} left)", remaining);
                }
                self.fsm.switch_state(BeginningScene::WaitForTimeout);
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
    use crate::context::TimerKind;

    fn detected() -> Event {
        Event::TimerDetected {
            kind: TimerKind::Standard,
            remaining: "3:00".to_string(),
            first_seen_msec: 0,
        }
    }

    fn update(remaining: &str) -> Event {
        Event::TimerUpdate {
            remaining: remaining.to_string(),
            first_seen_msec: 0,
        }
    }

    fn deliver(detector: &mut BeginningDetector, ctx: &mut Context, event: Event) -> Vec<Event> {
        let mut emitter = Emitter::new();
        detector.on_event(ctx, &event, &mut emitter);
        emitter.drain()
    }

    fn tick(detector: &mut BeginningDetector, ctx: &mut Context, tick: u64) -> bool {
        ctx.engine.tick = tick;
        ctx.engine.msec = tick * 100;
        detector.detect(ctx, &SceneRegistry::new(), &mut Emitter::new())
    }

    #[test]
    fn test_full_clock_emits_beginning_once() {
        let mut detector = BeginningDetector::new();
        let mut ctx = Context::new();

        assert!(deliver(&mut detector, &mut ctx, detected()).is_empty());
        assert!(!tick(&mut detector, &mut ctx, 1));
        assert_eq!(detector.state(), BeginningScene::Waiting);

        assert_eq!(deliver(&mut detector, &mut ctx, update("3:00")), vec![Event::GameBeginning]);
        tick(&mut detector, &mut ctx, 2);
        assert_eq!(detector.state(), BeginningScene::WaitForTimeout);

        assert!(deliver(&mut detector, &mut ctx, update("3:00")).is_empty());
        assert!(deliver(&mut detector, &mut ctx, update("2:59")).is_empty());
    }

    #[test]
    fn test_joining_late_does_not_emit() {
        let mut detector = BeginningDetector::new();
        let mut ctx = Context::new();

        deliver(&mut detector, &mut ctx, detected());
        assert!(deliver(&mut detector, &mut ctx, update("1:42")).is_empty());
        tick(&mut detector, &mut ctx, 1);
        assert_eq!(detector.state(), BeginningScene::WaitForTimeout);
    }

    #[test]
    fn test_update_without_detection_is_ignored() {
        let mut detector = BeginningDetector::new();
        let mut ctx = Context::new();

        assert!(deliver(&mut detector, &mut ctx, update("5:00")).is_empty());
        assert_eq!(detector.state(), BeginningScene::Default);
    }

    #[test]
    fn test_timer_reset_rearms() {
        let mut detector = BeginningDetector::new();
        let mut ctx = Context::new();

        deliver(&mut detector, &mut ctx, detected());
        deliver(&mut detector, &mut ctx, update("5:00"));
        tick(&mut detector, &mut ctx, 1);

        deliver(&mut detector, &mut ctx, Event::TimerReset);
        assert_eq!(detector.state(), BeginningScene::Default);

        deliver(&mut detector, &mut ctx, detected());
        assert_eq!(deliver(&mut detector, &mut ctx, update("5:00")), vec![Event::GameBeginning]);
    }
}

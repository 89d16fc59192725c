/// Explicit finite-state machine for stateful detectors
///
/// The current state is a plain enum value; each detector dispatches on it
/// with an exhaustive `match`. A switch requested during a tick (or from an
/// event hook) takes effect when the next tick begins.
use std::fmt::Debug;

pub struct StateMachine<S> {
    initial: S,
    state: S,
    pending: Option<S>,
    /// Stream time at which `state` became active; `None` until the first
    /// transition and again after a reset
    entered_msec: Option<u64>,
    label: &'static str,
}

impl<S: Copy + Eq + Debug> StateMachine<S> {
    /// Create a machine in its designated initial state
    pub fn new(label: &'static str, initial: S) -> Self {
        Self {
            initial,
            state: initial,
            pending: None,
            entered_msec: None,
            label,
        }
    }

    /// Current state (a pending switch is not visible yet)
    pub fn state(&self) -> S {
        self.state
    }

    pub fn pending(&self) -> Option<S> {
        self.pending
    }

    /// Request a transition, applied at the start of the next tick
    pub fn switch_state(&mut self, next: S) {
        self.pending = Some(next);
    }

    /// Apply any pending transition and return the state to run this tick
    pub fn begin_tick(&mut self, now_msec: u64) -> S {
        if let Some(next) = self.pending.take() {
            if next != self.state {
                match self.entered_msec {
                    Some(entered) => tracing::debug!(
                        "{}: {:?} -> {:?} after {} ms",
                        self.label,
                        self.state,
                        next,
                        now_msec.saturating_sub(entered)
                    ),
                    None => tracing::debug!("{}: {:?} -> {:?}", self.label, self.state, next),
                }
                self.state = next;
                self.entered_msec = Some(now_msec);
            }
        }
        self.state
    }

    /// Force the initial state, dropping any pending switch
    pub fn reset(&mut self) {
        if self.state != self.initial {
            tracing::debug!("{}: reset from {:?}", self.label, self.state);
        }
        self.state = self.initial;
        self.pending = None;
        self.entered_msec = None;
    }
}

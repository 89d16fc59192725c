/// Event listeners
///
/// Listeners see every event in emission order, together with the context
/// of the tick that produced it. They cannot fail the tick.
use crate::context::Context;

use super::events::Event;

pub trait EventListener: Send {
    fn on_event(&mut self, ctx: &Context, event: &Event);
}

/// Reports every event through `tracing`
#[derive(Debug, Default)]
pub struct LogListener;

impl EventListener for LogListener {
    fn on_event(&mut self, ctx: &Context, event: &Event) {
        tracing::info!(
            tick = ctx.tick(),
            msec = ctx.msec(),
            event = event.name(),
            "{}",
            event.description()
        );
    }
}

/// Event together with the time it was raised
#[derive(Debug, Clone, PartialEq)]
pub struct StampedEvent {
    pub tick: u64,
    pub msec: u64,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_listener_does_not_panic() {
        let mut listener = LogListener;
        listener.on_event(&Context::new(), &Event::GameFinish);
    }
}

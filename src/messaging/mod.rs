/// Event delivery
///
/// ```text
/// Detector ──emit──> Engine queue ──FIFO──> listeners (registration order)
///                                     │         ├── LogListener
///                                     │         └── EventBus ──channels──> consumers
///                                     └──> detector event hooks
/// ```
pub mod bus;
pub mod events;
pub mod listener;

pub use bus::{EventBus, SubscriberId};
pub use events::Event;
pub use listener::{EventListener, LogListener, StampedEvent};

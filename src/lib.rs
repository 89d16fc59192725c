// Library exports for the replay binary and integration tests
pub mod assets;
pub mod config;
pub mod context;
pub mod detection;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod messaging;
pub mod ocr;
pub mod preview;
pub mod utils;

pub use context::{Context, Frame};
pub use engine::Engine;
pub use messaging::Event;

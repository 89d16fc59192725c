use thiserror::Error;

use crate::detection::SceneId;

/// Initialization-time errors using thiserror for structured error handling.
///
/// Nothing in here is raised per tick: a tick that cannot classify a frame
/// resolves to "no match" instead. These errors abort detector setup and can
/// be chained with anyhow in the binary.

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Could not find mask {name} (searched: {searched:?})")]
    NotFound { name: String, searched: Vec<String> },

    #[error("Failed to decode mask image: {path}")]
    DecodeFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Mask {name} is {actual:?}, expected {expected:?} or the ROI size")]
    UnexpectedSize {
        name: String,
        actual: (u32, u32),
        expected: (u32, u32),
    },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model file: {path}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write model file: {path}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model file: {path}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Sample {index} has {actual} pixels, expected {expected}")]
    SampleSize {
        index: usize,
        actual: usize,
        expected: usize,
    },

    #[error("Sample geometry {width}x{height} is not usable")]
    Geometry { width: u32, height: u32 },

    #[error("Model has no samples to train on")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{scene:?} is registered twice")]
    DuplicateScene { scene: SceneId },

    #[error("{scene:?} depends on {dependency:?}, which must be registered before it")]
    DependencyOrder { scene: SceneId, dependency: SceneId },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;

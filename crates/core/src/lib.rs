// Core types shared by the tunestream crates

pub mod config;
pub mod error;
pub mod state;

// Re-export commonly used types
pub use config::{EngineConfig, GainPolicy, MIN_READ_BUFFER_SIZE};
pub use error::{AudioError, Result};
pub use state::{position_ms, DecodeDiagnostics, PlaybackStatus, PlayerState};

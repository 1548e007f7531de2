// Error handling for the streaming engine

use std::fmt;

/// Engine error types
#[derive(Debug, Clone)]
pub enum AudioError {
    /// Failed to initialize the engine
    InitializationError(String),

    /// Buffer or decoder session could not be allocated
    ResourceExhausted(String),

    /// Failed to open a track
    LoadError(String),

    /// Decoder session could not be created or reset
    DecodingError(String),

    /// Audio sink error (hardware or stream issues)
    DeviceError(String),

    /// Thread/synchronization error
    ThreadError(String),

    /// IO error
    IoError(String),

    /// Invalid or unreadable configuration
    ConfigError(String),

    /// Operation not valid in the current state
    InvalidState(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AudioError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            AudioError::ResourceExhausted(msg) => write!(f, "Resource exhausted: {}", msg),
            AudioError::LoadError(msg) => write!(f, "Load error: {}", msg),
            AudioError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AudioError::DeviceError(msg) => write!(f, "Device error: {}", msg),
            AudioError::ThreadError(msg) => write!(f, "Thread error: {}", msg),
            AudioError::IoError(msg) => write!(f, "IO error: {}", msg),
            AudioError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AudioError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AudioError>;

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for AudioError {
    fn from(err: toml::de::Error) -> Self {
        AudioError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = AudioError::LoadError("missing.mp3".to_string());
        assert_eq!(err.to_string(), "Load error: missing.mp3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AudioError = io.into();
        assert!(matches!(err, AudioError::IoError(ref msg) if msg.contains("gone")));
    }
}

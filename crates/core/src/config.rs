// Engine configuration

use crate::error::{AudioError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Working buffer for compressed input (bytes)
const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Longest Layer III frame (320 kbps at 32 kHz, padded)
const MAX_FRAME_BYTES: usize = 1441;

/// Smallest usable read buffer: a whole frame plus the header of the one after
/// it, wherever in the stream the window happens to start
pub const MIN_READ_BUFFER_SIZE: usize = 2 * MAX_FRAME_BYTES + 4;

/// Sink write timeout (milliseconds)
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;

/// How long the worker idles between checks when nothing plays (milliseconds)
const DEFAULT_IDLE_INTERVAL_MS: u64 = 20;

/// How long `play` waits for the worker to leave the decode loop (milliseconds)
const DEFAULT_PLAY_GRACE_MS: u64 = 30;

/// Bounded wait for the worker to leave the decode loop during shutdown.
/// Slightly longer than one sink write timeout.
const DEFAULT_DECODE_EXIT_TIMEOUT_MS: u64 = 600;

/// Bounded wait for the worker to report exit during shutdown
const DEFAULT_WORKER_EXIT_TIMEOUT_MS: u64 = 2000;

/// Decoder thread stack size (bytes)
const DEFAULT_WORKER_STACK_SIZE: usize = 512 * 1024;

/// Sink rate configured at track start, before the first frame reports the real one
const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Decodes slower than this are reported (milliseconds)
const DEFAULT_SLOW_DECODE_MS: u64 = 20;

/// Output gain staging applied to every decoded sample
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainPolicy {
    /// Scale by a fixed factor in `0.0..=1.0` to leave headroom against clipping
    Fixed(f32),
    /// Pass samples through untouched (headroom handled elsewhere)
    Unity,
}

impl Default for GainPolicy {
    fn default() -> Self {
        GainPolicy::Fixed(0.7)
    }
}

impl GainPolicy {
    /// Apply the policy in place
    pub fn apply(&self, samples: &mut [i16]) {
        match *self {
            GainPolicy::Unity => {}
            GainPolicy::Fixed(factor) => {
                for sample in samples.iter_mut() {
                    // float -> int casts saturate
                    *sample = (*sample as f32 * factor) as i16;
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            GainPolicy::Fixed(factor) if !(0.0..=1.0).contains(&factor) => Err(
                AudioError::ConfigError(format!("gain factor out of range: {}", factor)),
            ),
            _ => Ok(()),
        }
    }
}

/// Tunables for the decode engine. Every field has a default, so a partial
/// TOML document (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub read_buffer_size: usize,
    pub write_timeout_ms: u64,
    pub idle_interval_ms: u64,
    pub play_grace_ms: u64,
    pub decode_exit_timeout_ms: u64,
    pub worker_exit_timeout_ms: u64,
    pub worker_stack_size: usize,
    pub default_sample_rate: u32,
    pub slow_decode_ms: u64,
    pub gain: GainPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            idle_interval_ms: DEFAULT_IDLE_INTERVAL_MS,
            play_grace_ms: DEFAULT_PLAY_GRACE_MS,
            decode_exit_timeout_ms: DEFAULT_DECODE_EXIT_TIMEOUT_MS,
            worker_exit_timeout_ms: DEFAULT_WORKER_EXIT_TIMEOUT_MS,
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
            default_sample_rate: DEFAULT_SAMPLE_RATE,
            slow_decode_ms: DEFAULT_SLOW_DECODE_MS,
            gain: GainPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AudioError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size < MIN_READ_BUFFER_SIZE {
            return Err(AudioError::ConfigError(format!(
                "read_buffer_size {} is below the minimum of {} bytes",
                self.read_buffer_size, MIN_READ_BUFFER_SIZE
            )));
        }
        if self.default_sample_rate == 0 {
            return Err(AudioError::ConfigError(
                "default_sample_rate must be non-zero".to_string(),
            ));
        }
        if self.worker_stack_size == 0 {
            return Err(AudioError::ConfigError("worker_stack_size must be non-zero".to_string()));
        }
        self.gain.validate()
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn play_grace(&self) -> Duration {
        Duration::from_millis(self.play_grace_ms)
    }

    pub fn decode_exit_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_exit_timeout_ms)
    }

    pub fn worker_exit_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_exit_timeout_ms)
    }

    pub fn slow_decode(&self) -> Duration {
        Duration::from_millis(self.slow_decode_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.write_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str("write_timeout_ms = 250\ngain = \"unity\"").unwrap();
        assert_eq!(config.write_timeout_ms, 250);
        assert_eq!(config.gain, GainPolicy::Unity);
        assert_eq!(config.read_buffer_size, 16 * 1024);
    }

    #[test]
    fn test_fixed_gain_table() {
        let config = EngineConfig::from_toml_str("gain = { fixed = 0.5 }").unwrap();
        assert_eq!(config.gain, GainPolicy::Fixed(0.5));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("read_buffer_size = 0"),
            Err(AudioError::ConfigError(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("read_buffer_size = 64"),
            Err(AudioError::ConfigError(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("gain = { fixed = 1.5 }"),
            Err(AudioError::ConfigError(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("write_timeout_ms = \"soon\""),
            Err(AudioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_read_buffer_must_hold_a_frame_and_next_header() {
        let at_minimum = EngineConfig {
            read_buffer_size: MIN_READ_BUFFER_SIZE,
            ..EngineConfig::default()
        };
        assert!(at_minimum.validate().is_ok());

        let too_small = EngineConfig {
            read_buffer_size: MIN_READ_BUFFER_SIZE - 1,
            ..EngineConfig::default()
        };
        assert!(matches!(too_small.validate(), Err(AudioError::ConfigError(_))));
        assert!(DEFAULT_READ_BUFFER_SIZE >= MIN_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "idle_interval_ms = 5").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.idle_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_fixed_gain_scales() {
        let mut samples = [1000i16, -1000, i16::MAX, i16::MIN];
        GainPolicy::Fixed(0.5).apply(&mut samples);
        assert_eq!(samples, [500, -500, 16383, -16384]);

        let mut untouched = [i16::MAX, 5];
        GainPolicy::Unity.apply(&mut untouched);
        assert_eq!(untouched, [i16::MAX, 5]);
    }
}

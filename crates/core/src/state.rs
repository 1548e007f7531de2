// Playback state as seen by the control side

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Nothing is playing (no track, track finished, stopped, or failed to open)
    #[default]
    Stopped,
    /// A track is playing or about to start
    Playing,
    /// A track is loaded but output is suspended
    Paused,
}

impl PlayerState {
    /// Derive the state from the raw control flags.
    ///
    /// A pending track counts as playing: the worker will start it on its next check
    /// unless the open fails, in which case the flags fall back to stopped.
    pub fn from_flags(should_play: bool, should_pause: bool, track_pending: bool) -> Self {
        if track_pending {
            PlayerState::Playing
        } else if !should_play {
            PlayerState::Stopped
        } else if should_pause {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        }
    }
}

/// Snapshot of the published playback scalars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    /// Elapsed position of the current track in milliseconds
    pub position_ms: u32,
    /// Sample frames decoded and handed to the sink for the current track
    pub samples_written: u64,
    /// Rate of the current track; the configured default until the first frame is decoded
    pub sample_rate: u32,
    /// Volume percentage (0 - 100)
    pub volume: u8,
    /// The current track reached its end
    pub finished: bool,
}

/// Derive elapsed milliseconds from a sample count, saturating at `u32::MAX`.
pub fn position_ms(samples_written: u64, sample_rate: u32) -> u32 {
    if sample_rate == 0 {
        return 0;
    }
    let ms = samples_written.saturating_mul(1000) / sample_rate as u64;
    u32::try_from(ms).unwrap_or(u32::MAX)
}

/// Diagnostic counters published by the decode worker.
/// They never influence playback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeDiagnostics {
    /// Frames decoded for the current track
    pub frames_decoded: u64,
    /// Samples at or beyond the near-clipping threshold for the current track
    pub clipped_samples: u64,
    /// Lowest sample value written for the current track
    pub min_sample: i16,
    /// Highest sample value written for the current track
    pub max_sample: i16,
    /// Sink writes that timed out since init
    pub write_timeouts: u64,
    /// Low-input episodes since init
    pub low_input_events: u64,
    /// Decodes slower than the configured threshold since init
    pub slow_decodes: u64,
}

// Audio sink abstraction
//
// The engine writes interleaved stereo i16 blocks to a sink with a bounded-time
// blocking write. Implementations must be callable from both the control thread
// (amplifier, volume) and the decode worker (rate, writes).

pub mod adapter;
pub mod memory;

#[cfg(feature = "cpal")]
pub mod cpal_sink;

pub use adapter::{BlockWrite, SinkAdapter};
pub use memory::{MemorySink, Pacing, SinkEvent};

#[cfg(feature = "cpal")]
pub use cpal_sink::CpalSink;

use std::time::Duration;
use tunestream_core::Result;

/// Channel count of every block handed to a sink
pub const OUTPUT_CHANNELS: u16 = 2;

/// Outcome of a bounded write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The whole block was accepted
    Written,
    /// The sink could not accept the block before the timeout
    TimedOut,
}

/// Audio output capability
pub trait AudioSink: Send + Sync {
    /// Configure the output sample rate. Callers stop the sink first.
    fn set_rate(&self, rate_hz: u32) -> Result<()>;

    /// Current volume percentage (0 - 100)
    fn volume(&self) -> Result<u8>;

    /// Set volume percentage (0 - 100)
    fn set_volume(&self, percent: u8) -> Result<()>;

    /// Enable or mute the output stage
    fn set_amplifier(&self, enabled: bool) -> Result<()>;

    /// Stop the output stream
    fn stop(&self) -> Result<()>;

    /// Start the output stream
    fn start(&self) -> Result<()>;

    /// Write interleaved samples, blocking for at most `timeout`
    fn write(&self, samples: &[i16], timeout: Duration) -> Result<WriteOutcome>;
}

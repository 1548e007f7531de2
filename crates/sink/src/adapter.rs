// Sequencing layer over an AudioSink
//
// Owns the knowledge of which rate the sink is configured for, so rate changes
// happen only when needed and always as stop -> set rate -> start.

use crate::{AudioSink, WriteOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Result of one block write as seen by the decode loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWrite {
    Written,
    TimedOut,
    Failed,
}

pub struct SinkAdapter {
    sink: Arc<dyn AudioSink>,
    configured_rate: u32,
}

impl SinkAdapter {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            configured_rate: 0,
        }
    }

    /// Rate the sink was last configured with, 0 if never
    pub fn configured_rate(&self) -> u32 {
        self.configured_rate
    }

    /// Unconditionally reset the output: stop, set rate, start
    pub fn restart_at(&mut self, rate_hz: u32) {
        if let Err(e) = self.sink.stop() {
            log::warn!("Sink stop failed: {}", e);
        }
        match self.sink.set_rate(rate_hz) {
            Ok(()) => self.configured_rate = rate_hz,
            Err(e) => log::error!("Failed to set sink rate to {} Hz: {}", rate_hz, e),
        }
        if let Err(e) = self.sink.start() {
            log::error!("Sink start failed: {}", e);
        }
    }

    /// Reconfigure only if `rate_hz` differs from the configured rate.
    /// Returns true when a reconfiguration happened.
    pub fn ensure_rate(&mut self, rate_hz: u32) -> bool {
        if rate_hz == self.configured_rate {
            return false;
        }
        log::info!("Changing sample rate from {} to {} Hz", self.configured_rate, rate_hz);
        self.restart_at(rate_hz);
        true
    }

    pub fn enable_output(&self, volume: u8) {
        if let Err(e) = self.sink.set_amplifier(true) {
            log::warn!("Failed to enable amplifier: {}", e);
        }
        if let Err(e) = self.sink.set_volume(volume) {
            log::warn!("Failed to apply volume {}: {}", volume, e);
        }
    }

    pub fn mute(&self) {
        if let Err(e) = self.sink.set_amplifier(false) {
            log::warn!("Failed to disable amplifier: {}", e);
        }
    }

    pub fn write_block(&self, samples: &[i16], timeout: Duration) -> BlockWrite {
        match self.sink.write(samples, timeout) {
            Ok(WriteOutcome::Written) => BlockWrite::Written,
            Ok(WriteOutcome::TimedOut) => BlockWrite::TimedOut,
            Err(e) => {
                log::error!("Sink write failed: {}", e);
                BlockWrite::Failed
            }
        }
    }
}

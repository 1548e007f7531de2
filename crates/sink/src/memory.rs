// In-memory sink: captures output for tests, or discards it at real-time pace
// for headless runs.

use crate::{AudioSink, WriteOutcome, OUTPUT_CHANNELS};
use parking_lot::Mutex;
use std::thread;
use std::time::Duration;
use tunestream_core::Result;

/// Sink control calls, in the order they were made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Stop,
    Start,
    SetRate(u32),
    Amplifier(bool),
    Volume(u8),
}

/// How long a write takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Writes return immediately
    Immediate,
    /// Every write takes a fixed time
    Fixed(Duration),
    /// Writes take as long as the block would take to play
    RealTime,
}

struct MemorySinkState {
    rate: u32,
    volume: u8,
    amplifier: bool,
    running: bool,
    stalled: bool,
    events: Vec<SinkEvent>,
    captured: Vec<i16>,
    write_count: u64,
    samples_accepted: u64,
}

pub struct MemorySink {
    state: Mutex<MemorySinkState>,
    pacing: Pacing,
    capture: bool,
}

impl MemorySink {
    /// Immediate sink that keeps every written sample
    pub fn new() -> Self {
        Self::with_pacing(Pacing::Immediate, true)
    }

    /// Real-time paced sink that keeps nothing
    pub fn paced() -> Self {
        Self::with_pacing(Pacing::RealTime, false)
    }

    pub fn with_pacing(pacing: Pacing, capture: bool) -> Self {
        Self {
            state: Mutex::new(MemorySinkState {
                rate: 0,
                volume: 100,
                amplifier: false,
                running: false,
                stalled: false,
                events: Vec::new(),
                captured: Vec::new(),
                write_count: 0,
                samples_accepted: 0,
            }),
            pacing,
            capture,
        }
    }

    /// While stalled every write blocks for its full timeout and reports `TimedOut`
    pub fn set_stalled(&self, stalled: bool) {
        self.state.lock().stalled = stalled;
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.state.lock().events.clone()
    }

    pub fn captured(&self) -> Vec<i16> {
        self.state.lock().captured.clone()
    }

    pub fn write_count(&self) -> u64 {
        self.state.lock().write_count
    }

    /// Interleaved samples accepted so far
    pub fn samples_accepted(&self) -> u64 {
        self.state.lock().samples_accepted
    }

    pub fn rate(&self) -> u32 {
        self.state.lock().rate
    }

    pub fn amplifier_enabled(&self) -> bool {
        self.state.lock().amplifier
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn play_time(&self, samples: usize, rate: u32) -> Duration {
        match self.pacing {
            Pacing::Immediate => Duration::ZERO,
            Pacing::Fixed(delay) => delay,
            Pacing::RealTime if rate == 0 => Duration::ZERO,
            Pacing::RealTime => {
                let frames = (samples / OUTPUT_CHANNELS as usize) as u64;
                Duration::from_micros(frames * 1_000_000 / rate as u64)
            }
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for MemorySink {
    fn set_rate(&self, rate_hz: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.rate = rate_hz;
        state.events.push(SinkEvent::SetRate(rate_hz));
        Ok(())
    }

    fn volume(&self) -> Result<u8> {
        Ok(self.state.lock().volume)
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        let mut state = self.state.lock();
        let volume = percent.min(100);
        state.volume = volume;
        state.events.push(SinkEvent::Volume(volume));
        Ok(())
    }

    fn set_amplifier(&self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.amplifier = enabled;
        state.events.push(SinkEvent::Amplifier(enabled));
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.running = false;
        state.events.push(SinkEvent::Stop);
        Ok(())
    }

    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.running = true;
        state.events.push(SinkEvent::Start);
        Ok(())
    }

    fn write(&self, samples: &[i16], timeout: Duration) -> Result<WriteOutcome> {
        let (stalled, rate) = {
            let state = self.state.lock();
            (state.stalled, state.rate)
        };

        if stalled {
            thread::sleep(timeout);
            return Ok(WriteOutcome::TimedOut);
        }

        // Sleep outside the lock so control calls are never held up by a write
        let play_time = self.play_time(samples.len(), rate);
        if play_time > timeout {
            thread::sleep(timeout);
            return Ok(WriteOutcome::TimedOut);
        }
        if !play_time.is_zero() {
            thread::sleep(play_time);
        }

        let mut state = self.state.lock();
        state.write_count += 1;
        state.samples_accepted += samples.len() as u64;
        if self.capture {
            state.captured.extend_from_slice(samples);
        }
        Ok(WriteOutcome::Written)
    }
}

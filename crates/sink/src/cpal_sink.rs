// cpal-based hardware sink
//
// The decode worker pushes i16 blocks into a ring buffer; the cpal callback
// drains it as f32. Rate changes rebuild the output stream.

use crate::{AudioSink, WriteOutcome, OUTPUT_CHANNELS};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tunestream_core::{AudioError, Result};
use tunestream_ringbuffer::SharedRingBuffer;

/// Ring buffer length in seconds of audio at the configured rate
const BUFFER_SECONDS: usize = 1;

pub struct CpalSink {
    device: Device,
    stream: Mutex<Option<Stream>>,
    ring_buffer: Mutex<SharedRingBuffer<i16>>,
    amplifier: Arc<AtomicBool>,
    volume: Arc<AtomicU8>,
}

impl CpalSink {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceError("No output device available".to_string()))?;

        if let Ok(name) = device.name() {
            log::info!("Using output device: {}", name);
        }

        Ok(Self {
            device,
            stream: Mutex::new(None),
            ring_buffer: Mutex::new(SharedRingBuffer::new(2)),
            amplifier: Arc::new(AtomicBool::new(false)),
            volume: Arc::new(AtomicU8::new(100)),
        })
    }

    fn build_stream(&self, rate_hz: u32, ring_buffer: SharedRingBuffer<i16>) -> Result<Stream> {
        let config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: cpal::SampleRate(rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        let amplifier = self.amplifier.clone();
        let volume = self.volume.clone();
        let mut scratch: Vec<i16> = Vec::new();

        self.device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if scratch.len() < data.len() {
                        scratch.resize(data.len(), 0);
                    }
                    let read = ring_buffer.read(&mut scratch[..data.len()]);

                    // Keep draining while muted so the writer never stalls
                    if !amplifier.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    let gain = volume.load(Ordering::Relaxed) as f32 / 100.0;
                    for (out, sample) in data.iter_mut().zip(&scratch[..read]) {
                        *out = *sample as f32 / 32768.0 * gain;
                    }

                    // Zero-fill any unwritten samples to prevent playing stale data
                    if read < data.len() {
                        data[read..].fill(0.0);
                    }
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::DeviceError(format!("Failed to build output stream: {}", e)))
    }
}

impl AudioSink for CpalSink {
    fn set_rate(&self, rate_hz: u32) -> Result<()> {
        let ring_buffer =
            SharedRingBuffer::new(rate_hz as usize * OUTPUT_CHANNELS as usize * BUFFER_SECONDS);
        let stream = self.build_stream(rate_hz, ring_buffer.clone())?;

        *self.stream.lock() = Some(stream);
        *self.ring_buffer.lock() = ring_buffer;
        log::debug!("Output stream rebuilt at {} Hz", rate_hz);
        Ok(())
    }

    fn volume(&self) -> Result<u8> {
        Ok(self.volume.load(Ordering::Relaxed))
    }

    fn set_volume(&self, percent: u8) -> Result<()> {
        self.volume.store(percent.min(100), Ordering::Relaxed);
        Ok(())
    }

    fn set_amplifier(&self, enabled: bool) -> Result<()> {
        self.amplifier.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if let Some(stream) = self.stream.lock().as_ref() {
            stream
                .pause()
                .map_err(|e| AudioError::DeviceError(format!("Failed to stop stream: {}", e)))?;
        }
        self.ring_buffer.lock().clear();
        Ok(())
    }

    fn start(&self) -> Result<()> {
        match self.stream.lock().as_ref() {
            Some(stream) => stream
                .play()
                .map_err(|e| AudioError::DeviceError(format!("Failed to start stream: {}", e))),
            None => Err(AudioError::InvalidState(
                "Sink started before a rate was set".to_string(),
            )),
        }
    }

    fn write(&self, samples: &[i16], timeout: Duration) -> Result<WriteOutcome> {
        let ring_buffer = self.ring_buffer.lock().clone();
        let written = ring_buffer.write_timeout(samples, timeout);
        if written == samples.len() {
            Ok(WriteOutcome::Written)
        } else {
            Ok(WriteOutcome::TimedOut)
        }
    }
}

// SAFETY: cpal::Stream is !Send+!Sync on some hosts because of platform
// threading rules. The stream is only created, started and stopped under the
// `stream` mutex, and every other field is already Send+Sync.
unsafe impl Send for CpalSink {}
unsafe impl Sync for CpalSink {}

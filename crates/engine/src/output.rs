// Decode/output loop
//
// One iteration: make sure input is buffered, decode one frame, post-process
// the PCM and hand it to the sink. The loop never sleeps; the only blocking
// call is the bounded sink write.

use crate::worker::Worker;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tunestream_decode::{FrameInfo, FrameOutcome};
use tunestream_sink::BlockWrite;

/// Below this many buffered bytes the input is reported as running low
const LOW_INPUT_BYTES: usize = 1024;

/// The low-input warning re-arms once this many bytes are buffered again
const LOW_INPUT_REARM_BYTES: usize = 4096;

/// Samples beyond this magnitude count as near clipping
const NEAR_CLIP_LEVEL: i32 = 32440;

/// Published diagnostics are refreshed every this many frames
const PUBLISH_INTERVAL_FRAMES: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// Stop, pause, a new track or shutdown was requested
    Interrupted,
    EndOfStream,
}

impl Worker {
    pub(crate) fn run_output_loop(&mut self) -> LoopExit {
        let shared = self.shared.clone();
        let mut skipped_last = false;

        loop {
            if shared.loop_exit_requested() {
                return LoopExit::Interrupted;
            }

            if !skipped_last && self.reader.refill() == 0 {
                self.finish_track();
                return LoopExit::EndOfStream;
            }
            skipped_last = false;
            self.check_input_level();

            let started = Instant::now();
            let info = self
                .decoder
                .decode_frame(self.reader.unconsumed(), &mut self.pcm);
            let elapsed = started.elapsed();
            if elapsed > self.config.slow_decode() {
                self.diagnostics.slow_decodes += 1;
                log::warn!("[worker] slow decode: {:?}", elapsed);
            }

            match info.outcome() {
                FrameOutcome::Decoded => {
                    self.reader.consume(info.consumed);
                    self.output_frame(&info);
                }
                FrameOutcome::Skipped => {
                    self.reader.consume(info.consumed);
                    skipped_last = true;
                }
                FrameOutcome::NeedMoreData => {
                    let before = self.reader.available();
                    let after = self.reader.refill();
                    if after == 0 || after == before {
                        self.finish_track();
                        return LoopExit::EndOfStream;
                    }
                    // Just refilled
                    skipped_last = true;
                }
            }
        }
    }

    fn output_frame(&mut self, info: &FrameInfo) {
        let shared = self.shared.clone();

        if !self.format_known {
            self.format_known = true;
            log::info!(
                "[worker] format: {} Hz, {} channel(s), {} kbps",
                info.sample_rate,
                info.channels,
                info.bitrate_kbps
            );
            self.sink.ensure_rate(info.sample_rate);
            shared.sample_rate.store(info.sample_rate, Ordering::SeqCst);
        }

        let frames = info.samples.min(self.pcm.len() / 2);
        let len = frames * 2;
        if info.channels == 1 {
            upmix_mono(&mut self.pcm, frames);
        }

        let block = &mut self.pcm[..len];
        self.config.gain.apply(block);
        self.record_levels(len);

        let block = &self.pcm[..len];
        let outcome = self.sink.write_block(block, self.config.write_timeout());
        // Position follows the decoded stream; a late or partial write does not move it back
        shared
            .samples_written
            .fetch_add(frames as u64, Ordering::SeqCst);
        match outcome {
            BlockWrite::Written => {}
            BlockWrite::TimedOut => {
                self.diagnostics.write_timeouts += 1;
                log::warn!(
                    "[worker] sink underrun: write timed out after {:?}, block dropped",
                    self.config.write_timeout()
                );
            }
            // Already logged by the adapter
            BlockWrite::Failed => {}
        }

        self.diagnostics.frames_decoded += 1;
        if self.diagnostics.frames_decoded % PUBLISH_INTERVAL_FRAMES == 0 {
            shared.publish_diagnostics(&self.diagnostics);
        }
    }

    fn record_levels(&mut self, len: usize) {
        let diagnostics = &mut self.diagnostics;
        for &sample in &self.pcm[..len] {
            diagnostics.min_sample = diagnostics.min_sample.min(sample);
            diagnostics.max_sample = diagnostics.max_sample.max(sample);
            if (sample as i32).abs() > NEAR_CLIP_LEVEL {
                diagnostics.clipped_samples += 1;
            }
        }
    }

    fn check_input_level(&mut self) {
        let available = self.reader.available();
        if available >= LOW_INPUT_REARM_BYTES {
            self.low_input_armed = true;
        } else if available < LOW_INPUT_BYTES
            && self.low_input_armed
            && !self.reader.is_exhausted()
        {
            self.low_input_armed = false;
            self.diagnostics.low_input_events += 1;
            log::warn!("[worker] input running low: {} bytes buffered", available);
        }
    }

    fn finish_track(&mut self) {
        let shared = &self.shared;
        shared.finished.store(true, Ordering::SeqCst);
        shared.should_play.store(false, Ordering::SeqCst);
        shared.publish_diagnostics(&self.diagnostics);

        let d = &self.diagnostics;
        log::info!(
            "[worker] track finished: {} frames, {} ms, range [{}, {}], {} near-clipped samples",
            d.frames_decoded,
            shared.position_ms(),
            d.min_sample,
            d.max_sample,
            d.clipped_samples
        );
    }
}

/// Duplicate the first `frames` mono samples into interleaved stereo, in place.
/// Walks backwards so no sample is overwritten before it is copied.
pub(crate) fn upmix_mono(pcm: &mut [i16], frames: usize) {
    for i in (0..frames).rev() {
        let sample = pcm[i];
        pcm[2 * i] = sample;
        pcm[2 * i + 1] = sample;
    }
}

// Playback controller: the public command surface
//
// Commands only flip flags in `EngineShared` and wake the worker. Nothing here
// waits for a track to open; the only waits are bounded.

use crate::control::EngineShared;
use crate::opener::{FsOpener, TrackOpener};
use crate::reader::StreamReader;
use crate::worker::Worker;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tunestream_core::{
    AudioError, DecodeDiagnostics, EngineConfig, PlaybackStatus, PlayerState, Result,
};
use tunestream_decode::{DecoderFactory, PCM_BUFFER_LEN};
use tunestream_sink::{AudioSink, SinkAdapter};

const WORKER_THREAD_NAME: &str = "tunestream-decode";

pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
    sink: Arc<dyn AudioSink>,
    factory: Arc<dyn DecoderFactory>,
    opener: Arc<dyn TrackOpener>,
    config: EngineConfig,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        factory: Arc<dyn DecoderFactory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared::new()),
            sink,
            factory,
            opener: Arc::new(FsOpener),
            config,
            worker: None,
        }
    }

    /// Replace the filesystem opener. Takes effect at the next `init`.
    pub fn with_opener(mut self, opener: Arc<dyn TrackOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.worker.is_some()
    }

    /// Allocate the working buffers, create the decoder session and start the
    /// worker. Calling it again restarts the engine.
    pub fn init(&mut self) -> Result<()> {
        if self.worker.is_some() {
            log::warn!("[engine] init called while running, shutting down first");
            self.shutdown();
        }

        self.config.validate()?;

        // Everything allocated here is dropped again if a later step fails
        let reader = StreamReader::with_capacity(self.config.read_buffer_size)?;
        let mut pcm = Vec::new();
        pcm.try_reserve_exact(PCM_BUFFER_LEN).map_err(|e| {
            AudioError::ResourceExhausted(format!("PCM buffer of {} samples: {}", PCM_BUFFER_LEN, e))
        })?;
        pcm.resize(PCM_BUFFER_LEN, 0);
        let decoder = self.factory.create_decoder()?;

        self.shared.reset();
        self.shared.worker_running.store(true, Ordering::SeqCst);

        let worker = Worker::new(
            self.shared.clone(),
            self.config.clone(),
            self.opener.clone(),
            reader,
            decoder,
            pcm,
            SinkAdapter::new(self.sink.clone()),
        );

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .stack_size(self.config.worker_stack_size)
            .spawn(move || worker.run())
            .map_err(|e| {
                self.shared.worker_running.store(false, Ordering::SeqCst);
                AudioError::ThreadError(format!("Failed to spawn decode worker: {}", e))
            })?;
        self.worker = Some(handle);

        if let Err(e) = self.sink.set_amplifier(false) {
            log::warn!("[engine] failed to mute sink: {}", e);
        }
        log::info!(
            "[engine] initialized ({} byte read buffer, {:?} write timeout)",
            self.config.read_buffer_size,
            self.config.write_timeout()
        );
        Ok(())
    }

    /// Stop the worker and release everything it owns. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        let handle = match self.worker.take() {
            Some(handle) => handle,
            None => return,
        };
        let shared = self.shared.clone();
        log::info!("[engine] shutting down");

        shared.cancel_pending_track();
        shared.bump_epoch();
        shared.should_play.store(false, Ordering::SeqCst);
        shared.should_pause.store(false, Ordering::SeqCst);
        shared.notifier.notify();

        let left_loop = shared
            .notifier
            .wait_until(self.config.decode_exit_timeout(), || {
                !shared.in_decode.load(Ordering::SeqCst)
            });
        if !left_loop {
            log::warn!(
                "[engine] worker still decoding after {:?}, continuing shutdown",
                self.config.decode_exit_timeout()
            );
        }

        shared.shutdown.store(true, Ordering::SeqCst);
        shared.notifier.notify();

        let exited = shared
            .notifier
            .wait_until(self.config.worker_exit_timeout(), || {
                !shared.worker_running.load(Ordering::SeqCst)
            });
        if !exited {
            log::warn!(
                "[engine] worker did not report exit within {:?}, joining anyway",
                self.config.worker_exit_timeout()
            );
        }

        if handle.join().is_err() {
            log::error!("[engine] decode worker panicked");
        }

        if let Err(e) = self.sink.set_amplifier(false) {
            log::warn!("[engine] failed to mute sink: {}", e);
        }
        shared.reset();
        log::info!("[engine] shut down");
    }

    /// Request playback of `track`. Returns once the request is published; the
    /// worker opens the file on its own time.
    pub fn play(&self, track: impl Into<PathBuf>) -> Result<()> {
        if self.worker.is_none() {
            return Err(AudioError::InvalidState(
                "play called before init".to_string(),
            ));
        }
        let track = track.into();
        let shared = &self.shared;
        log::info!("[engine] play {}", track.display());

        shared.should_play.store(false, Ordering::SeqCst);
        shared.should_pause.store(false, Ordering::SeqCst);
        shared.bump_epoch();
        shared.notifier.notify();

        let left_loop = shared.notifier.wait_until(self.config.play_grace(), || {
            !shared.in_decode.load(Ordering::SeqCst)
        });
        if !left_loop {
            log::debug!("[engine] worker still in decode loop, publishing track anyway");
        }

        shared.set_pending_track(track);
        Ok(())
    }

    pub fn stop(&self) {
        let shared = &self.shared;
        shared.cancel_pending_track();
        shared.bump_epoch();
        shared.should_play.store(false, Ordering::SeqCst);
        shared.should_pause.store(false, Ordering::SeqCst);
        shared.notifier.notify();

        if let Err(e) = self.sink.set_amplifier(false) {
            log::warn!("[engine] failed to mute sink: {}", e);
        }
    }

    pub fn pause(&self) {
        self.shared.should_pause.store(true, Ordering::SeqCst);
        self.shared.notifier.notify();

        if let Err(e) = self.sink.set_amplifier(false) {
            log::warn!("[engine] failed to mute sink: {}", e);
        }
    }

    /// Continue a paused track. Ignored once the track was stopped, finished or
    /// failed to open, so the output stays muted.
    pub fn resume(&self) {
        if !self.shared.should_play.load(Ordering::SeqCst) {
            log::debug!("[engine] resume ignored, no active track");
            return;
        }
        self.shared.should_pause.store(false, Ordering::SeqCst);
        self.shared.notifier.notify();

        if let Err(e) = self.sink.set_amplifier(true) {
            log::warn!("[engine] failed to unmute sink: {}", e);
        }
    }

    /// Set the volume percentage, clamped to 0..=100
    pub fn set_volume(&self, volume: i32) {
        let volume = volume.clamp(0, 100) as u8;
        self.shared.volume.store(volume, Ordering::SeqCst);

        if let Err(e) = self.sink.set_volume(volume) {
            log::warn!("[engine] failed to set volume {}: {}", volume, e);
        }
    }

    pub fn volume(&self) -> u8 {
        self.shared.volume.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    pub fn position_ms(&self) -> u32 {
        self.shared.position_ms()
    }

    pub fn state(&self) -> PlayerState {
        self.shared.state()
    }

    pub fn status(&self) -> PlaybackStatus {
        let shared = &self.shared;
        PlaybackStatus {
            state: shared.state(),
            position_ms: shared.position_ms(),
            samples_written: shared.samples_written.load(Ordering::SeqCst),
            sample_rate: shared.sample_rate.load(Ordering::SeqCst),
            volume: shared.volume.load(Ordering::SeqCst),
            finished: shared.is_finished(),
        }
    }

    pub fn diagnostics(&self) -> DecodeDiagnostics {
        self.shared.diagnostics()
    }

    /// Poll for hosts that drive their own loop. Returns whether a track is
    /// still playing or about to start.
    pub fn process_once(&self) -> bool {
        let shared = &self.shared;
        shared.is_pending()
            || (shared.should_play.load(Ordering::SeqCst) && !shared.finished.load(Ordering::SeqCst))
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

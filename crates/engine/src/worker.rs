// Decode worker thread
//
// Owns every per-track resource (source, read window, decoder session, PCM
// buffer). The control side only ever touches `EngineShared`.

use crate::control::EngineShared;
use crate::opener::TrackOpener;
use crate::output::LoopExit;
use crate::reader::StreamReader;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tunestream_core::{DecodeDiagnostics, EngineConfig};
use tunestream_decode::FrameDecoder;
use tunestream_sink::SinkAdapter;

pub(crate) struct Worker {
    pub(crate) shared: Arc<EngineShared>,
    pub(crate) config: EngineConfig,
    pub(crate) opener: Arc<dyn TrackOpener>,
    pub(crate) reader: StreamReader,
    pub(crate) decoder: Box<dyn FrameDecoder>,
    pub(crate) pcm: Vec<i16>,
    pub(crate) sink: SinkAdapter,
    pub(crate) diagnostics: DecodeDiagnostics,
    /// The first decoded frame of the current track has been seen
    pub(crate) format_known: bool,
    /// The low-input warning may fire
    pub(crate) low_input_armed: bool,
}

impl Worker {
    pub fn new(
        shared: Arc<EngineShared>,
        config: EngineConfig,
        opener: Arc<dyn TrackOpener>,
        reader: StreamReader,
        decoder: Box<dyn FrameDecoder>,
        pcm: Vec<i16>,
        sink: SinkAdapter,
    ) -> Self {
        Self {
            shared,
            config,
            opener,
            reader,
            decoder,
            pcm,
            sink,
            diagnostics: DecodeDiagnostics::default(),
            format_known: false,
            low_input_armed: true,
        }
    }

    pub fn run(mut self) {
        log::info!("[worker] decode worker started");
        let shared = self.shared.clone();

        while !shared.shutdown.load(Ordering::SeqCst) {
            if shared.has_request() {
                shared.starting.store(true, Ordering::SeqCst);
                self.start_track();
                shared.starting.store(false, Ordering::SeqCst);
                continue;
            }

            if shared.wants_output() && self.reader.is_open() {
                shared.in_decode.store(true, Ordering::SeqCst);
                let exit = self.run_output_loop();
                shared.in_decode.store(false, Ordering::SeqCst);
                shared.publish_diagnostics(&self.diagnostics);
                shared.notifier.notify();
                log::debug!("[worker] decode loop exited: {:?}", exit);

                if exit == LoopExit::EndOfStream {
                    self.reader.close();
                }
                continue;
            }

            shared.notifier.wait_until(self.config.idle_interval(), || {
                shared.shutdown.load(Ordering::SeqCst)
                    || shared.has_request()
                    || (shared.wants_output() && self.reader.is_open())
            });
        }

        self.reader.close();
        shared.worker_running.store(false, Ordering::SeqCst);
        shared.notifier.notify();
        log::info!("[worker] decode worker exited");
        // Buffers and the decoder session drop here
    }

    /// Pick up a pending track: close the old source, open the new one and
    /// reset everything that belongs to a track. Runs with `starting` set, so
    /// every outcome is settled in the flags before control-side reads see it.
    fn start_track(&mut self) {
        let shared = self.shared.clone();
        let epoch = shared.current_epoch();

        // Counters go back to zero while the track still reads as pending
        shared.samples_written.store(0, Ordering::SeqCst);
        shared.finished.store(false, Ordering::SeqCst);
        shared
            .sample_rate
            .store(self.config.default_sample_rate, Ordering::SeqCst);

        let path = match shared.take_pending_track() {
            Some(path) => path,
            None => return,
        };

        self.reader.close();
        self.reset_track_diagnostics();

        let source = match self.opener.open(&path) {
            Ok(source) => source,
            Err(e) => {
                log::error!("[worker] failed to open {}: {}", path.display(), e);
                self.abandon_track();
                return;
            }
        };
        self.reader.open(source);

        if let Err(e) = self.decoder.reset() {
            log::error!("[worker] failed to reset decoder for {}: {}", path.display(), e);
            self.reader.close();
            self.abandon_track();
            return;
        }

        self.sink.restart_at(self.config.default_sample_rate);
        self.sink.enable_output(shared.volume.load(Ordering::SeqCst));
        log::info!("[worker] playing {}", path.display());

        // A stop or play issued since the request was taken wins
        shared.should_play.store(true, Ordering::SeqCst);
        if shared.current_epoch() != epoch {
            shared.should_play.store(false, Ordering::SeqCst);
            self.sink.mute();
            log::debug!("[worker] track start superseded: {}", path.display());
        }
    }

    fn abandon_track(&mut self) {
        self.shared.should_play.store(false, Ordering::SeqCst);
    }

    fn reset_track_diagnostics(&mut self) {
        self.format_known = false;
        self.low_input_armed = true;
        self.diagnostics.frames_decoded = 0;
        self.diagnostics.clipped_samples = 0;
        self.diagnostics.min_sample = 0;
        self.diagnostics.max_sample = 0;
        self.shared.publish_diagnostics(&self.diagnostics);
    }
}

// State shared between the control side and the decode worker
//
// Everything here is an independent atomic, except the single-slot track
// handoff and the published diagnostics. The condition variable carries no
// data; it only shortens bounded waits.

use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tunestream_core::{position_ms, DecodeDiagnostics, PlayerState};

/// Wake-up channel for bounded waits
#[derive(Default)]
pub(crate) struct Notifier {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Notifier {
    pub fn notify(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    /// Wait until `done` holds or `timeout` elapses. Returns the final value of `done`.
    pub fn wait_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        loop {
            if done() {
                return true;
            }
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                return done();
            }
        }
    }
}

pub(crate) struct EngineShared {
    pub should_play: AtomicBool,
    pub should_pause: AtomicBool,
    pub shutdown: AtomicBool,
    pub track_pending: AtomicBool,
    /// The worker took a request and has not settled it yet (opening the source)
    pub starting: AtomicBool,
    /// True only while the worker is inside the decode loop
    pub in_decode: AtomicBool,
    pub worker_running: AtomicBool,
    pub finished: AtomicBool,
    pub samples_written: AtomicU64,
    pub sample_rate: AtomicU32,
    pub volume: AtomicU8,
    /// Bumped by every stop/play so an in-flight track start can tell it was superseded
    pub epoch: AtomicU64,
    pending_track: Mutex<Option<PathBuf>>,
    diagnostics: Mutex<DecodeDiagnostics>,
    pub notifier: Notifier,
}

impl EngineShared {
    pub fn new() -> Self {
        Self {
            should_play: AtomicBool::new(false),
            should_pause: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            track_pending: AtomicBool::new(false),
            starting: AtomicBool::new(false),
            in_decode: AtomicBool::new(false),
            worker_running: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            samples_written: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
            volume: AtomicU8::new(100),
            epoch: AtomicU64::new(0),
            pending_track: Mutex::new(None),
            diagnostics: Mutex::new(DecodeDiagnostics::default()),
            notifier: Notifier::default(),
        }
    }

    /// Back to the values of a freshly constructed engine
    pub fn reset(&self) {
        self.should_play.store(false, Ordering::SeqCst);
        self.should_pause.store(false, Ordering::SeqCst);
        self.shutdown.store(false, Ordering::SeqCst);
        self.track_pending.store(false, Ordering::SeqCst);
        self.starting.store(false, Ordering::SeqCst);
        self.in_decode.store(false, Ordering::SeqCst);
        self.worker_running.store(false, Ordering::SeqCst);
        self.finished.store(false, Ordering::SeqCst);
        self.samples_written.store(0, Ordering::SeqCst);
        self.sample_rate.store(0, Ordering::SeqCst);
        self.volume.store(100, Ordering::SeqCst);
        self.pending_track.lock().take();
        *self.diagnostics.lock() = DecodeDiagnostics::default();
    }

    /// Publish a track for the worker. The flag changes under the slot lock so a
    /// request can never be taken without also clearing its flag.
    pub fn set_pending_track(&self, path: PathBuf) {
        {
            let mut slot = self.pending_track.lock();
            *slot = Some(path);
            self.track_pending.store(true, Ordering::SeqCst);
        }
        self.notifier.notify();
    }

    pub fn take_pending_track(&self) -> Option<PathBuf> {
        let mut slot = self.pending_track.lock();
        self.track_pending.store(false, Ordering::SeqCst);
        slot.take()
    }

    /// Drop any play request that the worker has not picked up yet
    pub fn cancel_pending_track(&self) {
        self.take_pending_track();
    }

    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Whether the worker has a reason to run the decode loop
    pub fn wants_output(&self) -> bool {
        self.should_play.load(Ordering::SeqCst)
            && !self.should_pause.load(Ordering::SeqCst)
            && !self.finished.load(Ordering::SeqCst)
    }

    /// Whether the worker should stop what it is doing and look at the flags again
    pub fn loop_exit_requested(&self) -> bool {
        !self.should_play.load(Ordering::SeqCst)
            || self.should_pause.load(Ordering::SeqCst)
            || self.track_pending.load(Ordering::SeqCst)
            || self.shutdown.load(Ordering::SeqCst)
    }

    /// A request waits in the slot (the worker's view)
    pub fn has_request(&self) -> bool {
        self.track_pending.load(Ordering::SeqCst)
    }

    /// A requested track has not started or failed yet (the control side's view)
    pub fn is_pending(&self) -> bool {
        self.track_pending.load(Ordering::SeqCst) || self.starting.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> u32 {
        if self.is_pending() {
            return 0;
        }
        position_ms(
            self.samples_written.load(Ordering::SeqCst),
            self.sample_rate.load(Ordering::SeqCst),
        )
    }

    pub fn is_finished(&self) -> bool {
        !self.is_pending() && self.finished.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PlayerState {
        PlayerState::from_flags(
            self.should_play.load(Ordering::SeqCst),
            self.should_pause.load(Ordering::SeqCst),
            self.is_pending(),
        )
    }

    pub fn publish_diagnostics(&self, diagnostics: &DecodeDiagnostics) {
        self.diagnostics.lock().clone_from(diagnostics);
    }

    pub fn diagnostics(&self) -> DecodeDiagnostics {
        self.diagnostics.lock().clone()
    }
}

// Shared fixtures for engine tests
//
// Tracks use a toy frame format so sample counts are exact:
//   0xA5, channels: u8, rate: u32 LE, count: u16 LE, count * channels i16 LE
//   0x5A, len: u8, len filler bytes        (non-audio block)
//   anything else                          (one junk byte)

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tunestream_core::{EngineConfig, GainPolicy, Result};
use tunestream_decode::{DecoderFactory, FrameDecoder, FrameInfo};
use tunestream_engine::{FsOpener, PlaybackEngine, TrackOpener, TrackSource};
use tunestream_sink::MemorySink;

const AUDIO_MARKER: u8 = 0xA5;
const SKIP_MARKER: u8 = 0x5A;
const AUDIO_HEADER_LEN: usize = 8;

pub fn audio_frame(channels: u8, rate: u32, samples: &[i16]) -> Vec<u8> {
    let count = (samples.len() / channels as usize) as u16;
    let mut frame = vec![AUDIO_MARKER, channels];
    frame.extend_from_slice(&rate.to_le_bytes());
    frame.extend_from_slice(&count.to_le_bytes());
    for sample in samples {
        frame.extend_from_slice(&sample.to_le_bytes());
    }
    frame
}

pub fn skip_frame(len: u8) -> Vec<u8> {
    let mut frame = vec![SKIP_MARKER, len];
    frame.extend(std::iter::repeat(0u8).take(len as usize));
    frame
}

/// `frames` stereo frames of `per_frame` samples per channel at `rate`
pub fn stereo_track(frames: usize, per_frame: usize, rate: u32) -> Vec<u8> {
    let samples: Vec<i16> = (0..per_frame * 2).map(|i| i as i16).collect();
    (0..frames)
        .flat_map(|_| audio_frame(2, rate, &samples))
        .collect()
}

pub struct ToyDecoder {
    resets: Arc<AtomicUsize>,
}

impl FrameDecoder for ToyDecoder {
    fn reset(&mut self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> FrameInfo {
        match input.first() {
            None => FrameInfo::need_more_data(),
            Some(&AUDIO_MARKER) => {
                if input.len() < AUDIO_HEADER_LEN {
                    return FrameInfo::need_more_data();
                }
                let channels = input[1] as usize;
                let rate = u32::from_le_bytes([input[2], input[3], input[4], input[5]]);
                let count = u16::from_le_bytes([input[6], input[7]]) as usize;
                let total = AUDIO_HEADER_LEN + count * channels * 2;
                if input.len() < total {
                    return FrameInfo::need_more_data();
                }

                let payload = &input[AUDIO_HEADER_LEN..total];
                for (slot, bytes) in pcm.iter_mut().zip(payload.chunks_exact(2)) {
                    *slot = i16::from_le_bytes([bytes[0], bytes[1]]);
                }
                FrameInfo {
                    consumed: total,
                    samples: count,
                    channels: channels as u16,
                    sample_rate: rate,
                    bitrate_kbps: 0,
                }
            }
            Some(&SKIP_MARKER) => {
                if input.len() < 2 || input.len() < 2 + input[1] as usize {
                    return FrameInfo::need_more_data();
                }
                FrameInfo::skipped(2 + input[1] as usize)
            }
            Some(_) => FrameInfo::skipped(1),
        }
    }
}

#[derive(Default)]
pub struct ToyDecoderFactory {
    pub resets: Arc<AtomicUsize>,
}

impl DecoderFactory for ToyDecoderFactory {
    fn create_decoder(&self) -> Result<Box<dyn FrameDecoder>> {
        Ok(Box::new(ToyDecoder {
            resets: self.resets.clone(),
        }))
    }
}

/// Records opens and closes (source drops) in order
#[derive(Default)]
pub struct CountingOpener {
    pub log: Arc<Mutex<Vec<String>>>,
    /// Time each open takes
    pub open_delay: Mutex<Duration>,
}

struct TrackedSource {
    inner: TrackSource,
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl Read for TrackedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.log.lock().push(format!("close {}", self.name));
    }
}

impl CountingOpener {
    pub fn events(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.events().iter().filter(|e| e.starts_with("open")).count()
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock() = delay;
    }
}

impl TrackOpener for CountingOpener {
    fn open(&self, path: &Path) -> Result<TrackSource> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.lock().push(format!("open {}", name));

        let delay = *self.open_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let inner = FsOpener.open(path)?;
        Ok(Box::new(TrackedSource {
            inner,
            name,
            log: self.log.clone(),
        }))
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        write_timeout_ms: 100,
        idle_interval_ms: 5,
        decode_exit_timeout_ms: 300,
        worker_exit_timeout_ms: 1000,
        gain: GainPolicy::Unity,
        ..EngineConfig::default()
    }
}

pub struct Harness {
    pub engine: PlaybackEngine,
    pub sink: Arc<MemorySink>,
    pub opener: Arc<CountingOpener>,
    pub resets: Arc<AtomicUsize>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(sink: MemorySink) -> Self {
        Self::with_config(sink, test_config())
    }

    pub fn with_config(sink: MemorySink, config: EngineConfig) -> Self {
        let sink = Arc::new(sink);
        let opener = Arc::new(CountingOpener::default());
        let factory = ToyDecoderFactory::default();
        let resets = factory.resets.clone();

        let mut engine = PlaybackEngine::new(sink.clone(), Arc::new(factory), config)
            .with_opener(opener.clone());
        engine.init().unwrap();

        Self {
            engine,
            sink,
            opener,
            resets,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn track(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(format!("{}.toy", name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn missing_track(&self) -> PathBuf {
        self.dir.path().join("missing.toy")
    }
}

/// Poll `cond` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

pub const WAIT: Duration = Duration::from_secs(5);

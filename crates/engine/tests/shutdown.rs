mod common;

use common::{stereo_track, test_config, wait_for, Harness, ToyDecoderFactory, WAIT};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tunestream_core::{EngineConfig, PlayerState};
use tunestream_engine::PlaybackEngine;
use tunestream_sink::{MemorySink, Pacing, SinkEvent};

#[test]
fn test_shutdown_mid_stream_stops_writes() {
    let sink = MemorySink::with_pacing(Pacing::Fixed(Duration::from_millis(2)), false);
    let mut h = Harness::new(sink);
    let track = h.track("long", &stereo_track(2000, 8, 8000));

    h.engine.play(&track).unwrap();
    assert!(wait_for(WAIT, || h.engine.position_ms() > 0));

    h.engine.shutdown();
    assert!(!h.engine.is_initialized());
    assert!(h.opener.events().contains(&"close long".to_string()));

    let writes = h.sink.write_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(h.sink.write_count(), writes);
    assert_eq!(h.sink.events().last(), Some(&SinkEvent::Amplifier(false)));

    let status = h.engine.status();
    assert_eq!(status.state, PlayerState::Stopped);
    assert_eq!(status.position_ms, 0);
    assert_eq!(status.samples_written, 0);
    assert!(!status.finished);
}

#[test]
fn test_shutdown_with_stalled_sink_is_bounded() {
    let config = EngineConfig {
        write_timeout_ms: 200,
        ..test_config()
    };
    let mut h = Harness::with_config(MemorySink::new(), config);
    let track = h.track("stall", &stereo_track(2000, 8, 8000));

    h.engine.play(&track).unwrap();
    assert!(wait_for(WAIT, || h.engine.position_ms() > 0));
    h.sink.set_stalled(true);

    let started = Instant::now();
    h.engine.shutdown();
    // One write timeout plus the bounded waits, far below the test budget
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!h.engine.is_initialized());
}

#[test]
fn test_shutdown_while_idle_and_twice() {
    let mut h = Harness::new(MemorySink::new());
    h.engine.shutdown();
    h.engine.shutdown();
    assert!(!h.engine.is_initialized());
    assert!(h.opener.events().is_empty());
}

#[test]
fn test_shutdown_while_paused() {
    let sink = MemorySink::with_pacing(Pacing::Fixed(Duration::from_millis(2)), false);
    let mut h = Harness::new(sink);
    let track = h.track("paused", &stereo_track(2000, 8, 8000));

    h.engine.play(&track).unwrap();
    assert!(wait_for(WAIT, || h.engine.position_ms() > 0));
    h.engine.pause();

    h.engine.shutdown();
    assert!(h.opener.events().contains(&"close paused".to_string()));
}

#[test]
fn test_init_after_shutdown_plays_again() {
    let mut h = Harness::new(MemorySink::new());
    let track = h.track("again", &stereo_track(10, 8, 8000));

    h.engine.shutdown();
    h.engine.init().unwrap();
    h.engine.play(&track).unwrap();
    assert!(wait_for(WAIT, || h.engine.is_finished()));
    assert_eq!(h.engine.status().samples_written, 80);
}

#[test]
fn test_reinit_mid_stream_restarts_cleanly() {
    let sink = MemorySink::with_pacing(Pacing::Fixed(Duration::from_millis(2)), false);
    let mut h = Harness::new(sink);
    let track = h.track("restart", &stereo_track(2000, 8, 8000));

    h.engine.play(&track).unwrap();
    assert!(wait_for(WAIT, || h.engine.position_ms() > 0));

    h.engine.init().unwrap();
    assert!(h.engine.is_initialized());
    assert_eq!(h.engine.state(), PlayerState::Stopped);
    assert!(h.opener.events().contains(&"close restart".to_string()));
}

#[test]
fn test_drop_shuts_down_worker() {
    let sink = Arc::new(MemorySink::with_pacing(
        Pacing::Fixed(Duration::from_millis(2)),
        false,
    ));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.toy");
    std::fs::write(&path, stereo_track(2000, 8, 8000)).unwrap();

    {
        let mut engine = PlaybackEngine::new(
            sink.clone(),
            Arc::new(ToyDecoderFactory::default()),
            test_config(),
        );
        engine.init().unwrap();
        engine.play(&path).unwrap();
        assert!(wait_for(WAIT, || engine.position_ms() > 0));
    }

    let writes = sink.write_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.write_count(), writes);
    assert!(!sink.amplifier_enabled());
}

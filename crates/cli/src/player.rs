// Host side of playback: playlist navigation and the service tick

use crate::commands::Command;
use crate::playlist::Playlist;
use std::time::{Duration, Instant};
use tunestream_core::{PlayerState, Result};
use tunestream_engine::PlaybackEngine;

/// Poll interval while a track plays
const ACTIVE_POLL: Duration = Duration::from_millis(10);

/// Poll interval while paused or stopped
const IDLE_POLL: Duration = Duration::from_millis(50);

const VOLUME_STEP: i32 = 5;

pub struct Player {
    engine: PlaybackEngine,
    playlist: Playlist,
    track_started: Instant,
    /// Stopped by the user; no auto-advance until the next play
    user_stopped: bool,
    /// Tracks in a row that failed to open
    failures: usize,
}

impl Player {
    pub fn new(engine: PlaybackEngine, playlist: Playlist) -> Self {
        Self {
            engine,
            playlist,
            track_started: Instant::now(),
            user_stopped: false,
            failures: 0,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.play_current()
    }

    fn play_current(&mut self) -> Result<()> {
        let path = self.playlist.current_path();
        log::info!(
            "Track {}/{}: {}",
            self.playlist.index() + 1,
            self.playlist.len(),
            self.playlist.current_name()
        );
        self.engine.play(path)?;
        self.track_started = Instant::now();
        self.user_stopped = false;
        Ok(())
    }

    /// Apply one command. Returns false when the host should exit.
    pub fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Next => {
                self.failures = 0;
                self.playlist.next();
                self.play_current()?;
            }
            Command::PrevOrRestart => {
                self.failures = 0;
                self.playlist.prev_or_restart(self.track_started.elapsed());
                self.play_current()?;
            }
            Command::TogglePause => match self.engine.state() {
                PlayerState::Playing => self.engine.pause(),
                PlayerState::Paused => self.engine.resume(),
                PlayerState::Stopped => self.play_current()?,
            },
            Command::VolumeUp => self.change_volume(VOLUME_STEP),
            Command::VolumeDown => self.change_volume(-VOLUME_STEP),
            Command::Info => println!("{}", self.info()),
            Command::Stop => {
                self.user_stopped = true;
                self.engine.stop();
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn change_volume(&mut self, delta: i32) {
        self.engine.set_volume(self.engine.volume() as i32 + delta);
        log::info!("Volume: {}%", self.engine.volume());
    }

    /// Advance past finished or unplayable tracks
    pub fn tick(&mut self) -> Result<()> {
        if self.user_stopped || self.engine.process_once() {
            return Ok(());
        }

        if self.engine.is_finished() {
            self.failures = 0;
            self.playlist.next();
            return self.play_current();
        }

        // Stopped without finishing and without being asked to: the open failed
        if self.engine.state() == PlayerState::Stopped {
            self.failures += 1;
            if self.failures >= self.playlist.len() {
                log::error!("No playable tracks left, stopping");
                self.user_stopped = true;
                return Ok(());
            }
            log::warn!("Skipping unplayable track {}", self.playlist.current_name());
            self.playlist.next();
            return self.play_current();
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        if self.engine.state() == PlayerState::Playing {
            ACTIVE_POLL
        } else {
            IDLE_POLL
        }
    }

    pub fn volume(&self) -> u8 {
        self.engine.volume()
    }

    pub fn info(&self) -> String {
        let status = self.engine.status();
        let seconds = status.position_ms / 1000;
        format!(
            "{:?} [{}/{}] {} {}:{:02} ({} Hz) volume {}%",
            status.state,
            self.playlist.index() + 1,
            self.playlist.len(),
            self.playlist.current_name(),
            seconds / 60,
            seconds % 60,
            status.sample_rate,
            status.volume
        )
    }

    pub fn shutdown(mut self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use tunestream_core::EngineConfig;
    use tunestream_decode::Mp3DecoderFactory;
    use tunestream_sink::MemorySink;

    const WAIT: Duration = Duration::from_secs(5);

    fn player(dir: &Path) -> Player {
        let mut engine = PlaybackEngine::new(
            Arc::new(MemorySink::new()),
            Arc::new(Mp3DecoderFactory),
            EngineConfig::default(),
        );
        engine.init().unwrap();
        Player::new(engine, Playlist::scan(dir).unwrap())
    }

    /// Tick until `cond` holds
    fn tick_until(player: &mut Player, mut cond: impl FnMut(&Player) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            player.tick().unwrap();
            if cond(player) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn library(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            // Empty tracks end as soon as they start
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_finished_track_advances() {
        let dir = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut player = player(dir.path());
        player.start().unwrap();

        assert!(tick_until(&mut player, |p| p.playlist.index() == 2));
        player.shutdown();
    }

    #[test]
    fn test_unplayable_track_is_skipped() {
        let dir = library(&["a.mp3", "b.mp3"]);
        let mut player = player(dir.path());
        std::fs::remove_file(dir.path().join("a.mp3")).unwrap();
        player.start().unwrap();

        assert!(tick_until(&mut player, |p| p.playlist.current_name() == "b.mp3"));
        player.shutdown();
    }

    #[test]
    fn test_all_unplayable_gives_up() {
        let dir = library(&["a.mp3", "b.mp3"]);
        let mut player = player(dir.path());
        std::fs::remove_file(dir.path().join("a.mp3")).unwrap();
        std::fs::remove_file(dir.path().join("b.mp3")).unwrap();
        player.start().unwrap();

        assert!(tick_until(&mut player, |p| p.user_stopped));
        player.shutdown();
    }

    #[test]
    fn test_stop_holds_position_in_playlist() {
        let dir = library(&["a.mp3", "b.mp3"]);
        let mut player = player(dir.path());

        assert!(player.handle(Command::Stop).unwrap());
        for _ in 0..10 {
            player.tick().unwrap();
        }
        assert_eq!(player.playlist.index(), 0);
        assert_eq!(player.engine.state(), PlayerState::Stopped);
        player.shutdown();
    }

    #[test]
    fn test_volume_steps_and_quit() {
        let dir = library(&["a.mp3"]);
        let mut player = player(dir.path());

        assert!(player.handle(Command::VolumeUp).unwrap());
        assert_eq!(player.volume(), 100);
        assert!(player.handle(Command::VolumeDown).unwrap());
        assert!(player.handle(Command::VolumeDown).unwrap());
        assert_eq!(player.volume(), 90);
        assert!(!player.handle(Command::Quit).unwrap());
        player.shutdown();
    }

    #[test]
    fn test_prev_early_in_track_goes_back() {
        let dir = library(&["a.mp3", "b.mp3", "c.mp3"]);
        let mut player = player(dir.path());
        player.user_stopped = true;

        assert!(player.handle(Command::PrevOrRestart).unwrap());
        assert_eq!(player.playlist.current_name(), "c.mp3");
        player.shutdown();
    }
}

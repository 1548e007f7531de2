// tunestream: play a directory of MP3 files from the terminal

mod commands;
mod player;
mod playlist;
mod settings;

use clap::Parser;
use commands::{Command, HELP};
use player::Player;
use playlist::Playlist;
use settings::Settings;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use tunestream_core::{EngineConfig, Result};
use tunestream_decode::Mp3DecoderFactory;
use tunestream_engine::PlaybackEngine;
use tunestream_sink::AudioSink;

/// Streaming MP3 player
#[derive(Parser, Debug)]
#[command(name = "tunestream")]
#[command(version)]
struct Args {
    /// Directory holding the .mp3 files to play
    music_dir: PathBuf,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where the volume setting is kept between runs
    #[arg(short, long, default_value = "tunestream-settings.toml")]
    settings: PathBuf,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[cfg(feature = "cpal")]
fn output_sink() -> Result<Arc<dyn AudioSink>> {
    Ok(Arc::new(tunestream_sink::CpalSink::new()?))
}

#[cfg(not(feature = "cpal"))]
fn output_sink() -> Result<Arc<dyn AudioSink>> {
    log::warn!("Built without audio output, decoding into a paced null sink");
    Ok(Arc::new(tunestream_sink::MemorySink::paced()))
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let settings = Settings::load(&args.settings).unwrap_or_else(|e| {
        log::warn!("Failed to load settings, using defaults: {}", e);
        Settings::default()
    });
    let playlist = Playlist::scan(&args.music_dir)?;

    let mut engine = PlaybackEngine::new(output_sink()?, Arc::new(Mp3DecoderFactory), config);
    engine.init()?;
    engine.set_volume(settings.volume as i32);

    let mut player = Player::new(engine, playlist);
    player.start()?;

    let (tx, rx) = mpsc::channel();
    commands::spawn_reader(tx)?;
    println!("{}", HELP);

    loop {
        match rx.recv_timeout(player.poll_interval()) {
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => {
                if !player.handle(command)? {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
        player.tick()?;
    }

    let settings = Settings {
        volume: player.volume(),
    };
    if let Err(e) = settings.save(&args.settings) {
        log::warn!("Failed to save settings: {}", e);
    }
    player.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// One-line stdin commands

use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    PrevOrRestart,
    TogglePause,
    VolumeUp,
    VolumeDown,
    Info,
    Stop,
    Quit,
}

impl Command {
    /// Parse one input line. A line holding only spaces toggles pause.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.is_empty() && line.trim().is_empty() {
            return Some(Command::TogglePause);
        }
        match line.trim() {
            "n" => Some(Command::Next),
            "p" => Some(Command::PrevOrRestart),
            "t" => Some(Command::TogglePause),
            "+" => Some(Command::VolumeUp),
            "-" => Some(Command::VolumeDown),
            "i" => Some(Command::Info),
            "s" => Some(Command::Stop),
            "q" => Some(Command::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "commands: n next, p previous/restart, space or t pause, +/- volume, i info, s stop, q quit";

/// Read stdin on its own thread and forward parsed commands. End of input
/// counts as quit.
pub fn spawn_reader(tx: Sender<Command>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("tunestream-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("stdin read failed: {}", e);
                        break;
                    }
                };
                match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("{}", HELP),
                }
            }
            let _ = tx.send(Command::Quit);
        })
}

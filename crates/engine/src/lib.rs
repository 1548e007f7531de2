// Streaming decode/output engine
//
// A control thread drives a `PlaybackEngine`; a single decode worker reads the
// current track incrementally, decodes it frame by frame and writes PCM to an
// `AudioSink`. The two sides share only atomics and a one-slot track handoff.

mod control;
mod controller;
mod opener;
mod output;
mod reader;
mod worker;

pub use controller::PlaybackEngine;
pub use opener::{FsOpener, TrackOpener};
pub use reader::{StreamReader, TrackSource};

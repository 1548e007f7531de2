// Frame decoder abstraction
//
// A decoder turns a window of compressed bytes into at most one frame of
// interleaved i16 PCM per call, telling the caller how many bytes it used.

pub mod frame;
pub mod mp3;

pub use mp3::{Mp3DecoderFactory, Mp3FrameDecoder};

use tunestream_core::Result;

/// Largest number of samples per channel a single frame can produce
pub const MAX_FRAME_SAMPLES: usize = 1152;

/// PCM buffer length (in i16 samples) that holds any decoded frame as stereo
pub const PCM_BUFFER_LEN: usize = MAX_FRAME_SAMPLES * 2;

/// Result of one decode call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Input bytes used, decoded or skipped
    pub consumed: usize,
    /// Samples per channel written to the PCM buffer
    pub samples: usize,
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// PCM was produced
    Decoded,
    /// Bytes were dropped without producing PCM
    Skipped,
    /// Not enough input to make progress
    NeedMoreData,
}

impl FrameInfo {
    pub fn need_more_data() -> Self {
        Self::default()
    }

    pub fn skipped(consumed: usize) -> Self {
        Self {
            consumed,
            ..Self::default()
        }
    }

    pub fn outcome(&self) -> FrameOutcome {
        if self.samples > 0 {
            FrameOutcome::Decoded
        } else if self.consumed > 0 {
            FrameOutcome::Skipped
        } else {
            FrameOutcome::NeedMoreData
        }
    }
}

/// Per-track decoder session
pub trait FrameDecoder: Send {
    /// Rebuild the session; called before every new track
    fn reset(&mut self) -> Result<()>;

    /// Decode at most one frame from the front of `input` into `pcm`.
    /// `pcm` must hold at least `PCM_BUFFER_LEN` samples.
    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> FrameInfo;
}

/// Creates decoder sessions for the engine
pub trait DecoderFactory: Send + Sync {
    fn create_decoder(&self) -> Result<Box<dyn FrameDecoder>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(FrameInfo::need_more_data().outcome(), FrameOutcome::NeedMoreData);
        assert_eq!(FrameInfo::skipped(10).outcome(), FrameOutcome::Skipped);

        let decoded = FrameInfo {
            consumed: 417,
            samples: 1152,
            channels: 2,
            sample_rate: 44100,
            bitrate_kbps: 128,
        };
        assert_eq!(decoded.outcome(), FrameOutcome::Decoded);
    }
}

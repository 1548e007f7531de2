// MP3 frame decoder using Symphonia
//
// Frame sync, tag skipping and metadata-frame detection happen here; Symphonia
// only ever sees one complete audio frame per packet.

use crate::frame::{id3v2_tag_len, is_metadata_frame, FrameHeader, HEADER_LEN, ID3V2_HEADER_LEN};
use crate::{DecoderFactory, FrameDecoder, FrameInfo, MAX_FRAME_SAMPLES};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_MP3};
use symphonia::core::formats::Packet;
use tunestream_core::{AudioError, Result};

/// What sits at the front of the input window
enum Scan {
    NeedMoreData,
    /// Bytes before the next plausible frame or tag
    Junk(usize),
    /// ID3v2 tag of the given total length
    Tag(usize),
    Frame(FrameHeader),
}

pub struct Mp3FrameDecoder {
    decoder: Box<dyn Decoder>,
    sample_buf: Option<(SignalSpec, SampleBuffer<i16>)>,
    /// Tag bytes still to drop, possibly beyond the current window
    skip_remaining: usize,
    next_ts: u64,
}

impl Mp3FrameDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decoder: make_codec()?,
            sample_buf: None,
            skip_remaining: 0,
            next_ts: 0,
        })
    }

    fn scan(input: &[u8]) -> Scan {
        if input.len() < HEADER_LEN {
            return Scan::NeedMoreData;
        }

        for offset in 0..=input.len() - HEADER_LEN {
            let window = &input[offset..];

            if window.starts_with(b"ID3") {
                if offset > 0 {
                    return Scan::Junk(offset);
                }
                match id3v2_tag_len(window) {
                    Some(len) => return Scan::Tag(len),
                    None if window.len() < ID3V2_HEADER_LEN => {
                        return Scan::NeedMoreData
                    }
                    None => continue,
                }
            }

            let header = match FrameHeader::parse(window) {
                Some(header) => header,
                None => continue,
            };

            // A following header in view must belong to the same stream
            if let Some(next) = window.get(header.frame_len..) {
                if next.len() >= HEADER_LEN {
                    match FrameHeader::parse(next) {
                        Some(next) if header.is_compatible(&next) => {}
                        _ => continue,
                    }
                }
            }

            if offset > 0 {
                return Scan::Junk(offset);
            }
            if window.len() < header.frame_len {
                return Scan::NeedMoreData;
            }
            return Scan::Frame(header);
        }

        // Keep a tail that may hold the start of a header
        Scan::Junk(input.len() - (HEADER_LEN - 1))
    }

    fn decode_audio(&mut self, header: &FrameHeader, frame: &[u8], pcm: &mut [i16]) -> FrameInfo {
        let duration = header.samples_per_frame() as u64;
        let packet = Packet::new_from_slice(0, self.next_ts, duration, frame);
        self.next_ts += duration;

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("Dropping frame the codec rejected: {}", e);
                return FrameInfo::skipped(frame.len());
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if decoded.frames() == 0 || channels == 0 || channels > 2 {
            return FrameInfo::skipped(frame.len());
        }

        // Rebuilt only when the stream layout changes
        if !matches!(&self.sample_buf, Some((buf_spec, _)) if *buf_spec == spec) {
            let buf = SampleBuffer::<i16>::new(MAX_FRAME_SAMPLES as u64, spec);
            self.sample_buf = Some((spec, buf));
        }
        let Some((_, sample_buf)) = self.sample_buf.as_mut() else {
            return FrameInfo::skipped(frame.len());
        };
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();
        let count = samples.len().min(pcm.len());
        pcm[..count].copy_from_slice(&samples[..count]);

        FrameInfo {
            consumed: frame.len(),
            samples: count / channels,
            channels: channels as u16,
            sample_rate: header.sample_rate,
            bitrate_kbps: header.bitrate_kbps,
        }
    }
}

impl FrameDecoder for Mp3FrameDecoder {
    fn reset(&mut self) -> Result<()> {
        self.decoder = make_codec()?;
        self.sample_buf = None;
        self.skip_remaining = 0;
        self.next_ts = 0;
        Ok(())
    }

    fn decode_frame(&mut self, input: &[u8], pcm: &mut [i16]) -> FrameInfo {
        if self.skip_remaining > 0 {
            let skip = self.skip_remaining.min(input.len());
            self.skip_remaining -= skip;
            return FrameInfo::skipped(skip);
        }

        match Self::scan(input) {
            Scan::NeedMoreData => FrameInfo::need_more_data(),
            Scan::Junk(len) => FrameInfo::skipped(len),
            Scan::Tag(len) => {
                log::debug!("Skipping {} byte ID3v2 tag", len);
                let skip = len.min(input.len());
                self.skip_remaining = len - skip;
                FrameInfo::skipped(skip)
            }
            Scan::Frame(header) => {
                let frame = &input[..header.frame_len];
                if is_metadata_frame(&header, frame) {
                    log::debug!("Skipping Xing/Info frame");
                    return FrameInfo::skipped(header.frame_len);
                }
                self.decode_audio(&header, frame, pcm)
            }
        }
    }
}

fn make_codec() -> Result<Box<dyn Decoder>> {
    let mut params = CodecParameters::new();
    params.for_codec(CODEC_TYPE_MP3);

    symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodingError(format!("Failed to create decoder: {}", e)))
}

/// Creates Symphonia-backed MP3 sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3DecoderFactory;

impl DecoderFactory for Mp3DecoderFactory {
    fn create_decoder(&self) -> Result<Box<dyn FrameDecoder>> {
        Ok(Box::new(Mp3FrameDecoder::new()?))
    }
}

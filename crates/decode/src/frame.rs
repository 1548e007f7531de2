// MPEG audio Layer III frame headers and the non-audio blocks around them

/// Header length in bytes
pub const HEADER_LEN: usize = 4;

/// ID3v2 tag header length in bytes
pub const ID3V2_HEADER_LEN: usize = 10;

const BITRATES_MPEG1: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_MPEG2: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl MpegVersion {
    fn sample_rates(self) -> [u32; 3] {
        match self {
            MpegVersion::Mpeg1 => [44100, 48000, 32000],
            MpegVersion::Mpeg2 => [22050, 24000, 16000],
            MpegVersion::Mpeg25 => [11025, 12000, 8000],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub has_crc: bool,
    pub channels: u16,
    /// Whole frame length including the header
    pub frame_len: usize,
}

impl FrameHeader {
    /// Parse a Layer III header from the first four bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let (b1, b2, b3) = (bytes[1], bytes[2], bytes[3]);

        if bytes[0] != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (b1 >> 3) & 0x03 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };

        // Layer III only
        if (b1 >> 1) & 0x03 != 0b01 {
            return None;
        }

        let bitrate_index = (b2 >> 4) as usize;
        let rate_index = ((b2 >> 2) & 0x03) as usize;
        // Free format (0) and the reserved values are not playable
        if bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
            return None;
        }

        let bitrate_kbps = match version {
            MpegVersion::Mpeg1 => BITRATES_MPEG1[bitrate_index],
            _ => BITRATES_MPEG2[bitrate_index],
        };
        let sample_rate = version.sample_rates()[rate_index];
        let padding = (b2 >> 1) & 0x01 == 1;
        let has_crc = b1 & 0x01 == 0;
        let channels = if b3 >> 6 == 0b11 { 1 } else { 2 };

        let coefficient = match version {
            MpegVersion::Mpeg1 => 144_000,
            _ => 72_000,
        };
        let frame_len = (coefficient * bitrate_kbps / sample_rate) as usize + padding as usize;

        Some(Self {
            version,
            bitrate_kbps,
            sample_rate,
            padding,
            has_crc,
            channels,
            frame_len,
        })
    }

    pub fn samples_per_frame(&self) -> usize {
        match self.version {
            MpegVersion::Mpeg1 => 1152,
            _ => 576,
        }
    }

    /// Side information length following the header (and CRC)
    pub fn side_info_len(&self) -> usize {
        match (self.version, self.channels) {
            (MpegVersion::Mpeg1, 1) => 17,
            (MpegVersion::Mpeg1, _) => 32,
            (_, 1) => 9,
            (_, _) => 17,
        }
    }

    /// Whether `other` could be the next frame of the same stream
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version && self.sample_rate == other.sample_rate
    }
}

/// Total length of an ID3v2 tag starting at `bytes[0]`, including header and footer.
/// `None` when `bytes` does not start with a complete tag header.
pub fn id3v2_tag_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < ID3V2_HEADER_LEN || &bytes[..3] != b"ID3" {
        return None;
    }
    // Syncsafe: seven significant bits per byte
    if bytes[6..10].iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | *b as usize);
    let footer = if bytes[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    Some(ID3V2_HEADER_LEN + size + footer)
}

/// True if `bytes` may be the start of an ID3v2 tag that is not fully in view yet
pub fn starts_like_id3v2(bytes: &[u8]) -> bool {
    let n = bytes.len().min(3);
    bytes[..n] == b"ID3"[..n]
}

/// Whether a complete frame is a Xing/Info or VBRI metadata frame rather than audio
pub fn is_metadata_frame(header: &FrameHeader, frame: &[u8]) -> bool {
    let crc = if header.has_crc { 2 } else { 0 };
    let xing_at = HEADER_LEN + crc + header.side_info_len();
    let tag_at = |offset: usize| frame.get(offset..offset + 4);

    matches!(tag_at(xing_at), Some(b"Xing") | Some(b"Info"))
        || matches!(tag_at(HEADER_LEN + 32), Some(b"VBRI"))
}

//! Container-agnostic types shared by every demultiplexer backend.

/// Recognised elementary stream types, as carried in an MPEG-TS PMT
/// `stream_type` byte (and mirrored for other containers where
/// applicable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// ISO/IEC 11172-2 (MPEG-1) video.
    Mpeg1Video,
    /// ISO/IEC 13818-2 (MPEG-2) video.
    Mpeg2Video,
    /// ITU-T H.264 / ISO/IEC 14496-10 AVC video.
    H264,
    /// ISO/IEC 13818-7 AAC audio.
    Aac,
    /// ATSC A/52 AC-3 audio.
    Ac3,
    /// DTS audio.
    Dts,
    /// Private data carrying e.g. DVB subtitles or teletext.
    PrivateData,
    /// A user-private stream type (`0x80..=0xFF`).
    UserPrivate(u8),
    /// Any other recognised-but-irrelevant-to-captions type.
    Other(u8),
}

impl StreamType {
    /// Maps a raw PMT `stream_type` byte onto a `StreamType`.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => StreamType::Mpeg1Video,
            0x02 => StreamType::Mpeg2Video,
            0x0F => StreamType::Aac,
            0x1B => StreamType::H264,
            0x06 => StreamType::PrivateData,
            0x81 => StreamType::Ac3,
            0x82 => StreamType::Dts,
            0x80..=0xFF => StreamType::UserPrivate(b),
            other => StreamType::Other(other),
        }
    }

    /// Whether this stream type can carry closed captions in user data
    /// (MPEG-2 or H.264 video).
    pub fn may_carry_captions(&self) -> bool {
        matches!(
            self,
            StreamType::Mpeg1Video | StreamType::Mpeg2Video | StreamType::H264
        )
    }
}

/// An entry in a Program Association Table.
#[derive(Debug, Clone)]
pub struct PatEntry {
    /// Program number (0 means this entry points at the Network PID).
    pub program_number: u16,
    /// PID of the PMT for this program (meaningless when
    /// `program_number == 0`).
    pub pmt_pid: u16,
    /// Last payload seen for this PAT's underlying PID, used to detect a
    /// content change that should force clearing all PMT state.
    pub last_payload: Vec<u8>,
}

/// A descriptor attached to a program or an elementary stream in a PMT.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Descriptor tag.
    pub tag: u8,
    /// Raw descriptor payload.
    pub data: Vec<u8>,
}

impl Descriptor {
    /// Teletext descriptor tags (EN 300 468).
    pub const TELETEXT_TAGS: [u8; 3] = [0x45, 0x46, 0x56];

    /// Whether this descriptor announces a teletext elementary stream.
    pub fn is_teletext(&self) -> bool {
        Self::TELETEXT_TAGS.contains(&self.tag)
    }

    /// Whether this descriptor announces a DVB subtitle elementary
    /// stream (tag `0x59`).
    pub fn is_dvb_subtitle(&self) -> bool {
        self.tag == 0x59
    }
}

/// Information about one elementary stream as announced by a PMT.
#[derive(Debug, Clone)]
pub struct ElementaryStreamInfo {
    /// Raw stream type byte from the PMT.
    pub stream_type_raw: u8,
    /// Decoded stream type.
    pub stream_type: StreamType,
    /// Elementary PID carrying this stream's data.
    pub elementary_pid: u16,
    /// Descriptors attached to this stream.
    pub descriptors: Vec<Descriptor>,
}

/// A Program Map Table entry: identifies one elementary stream within a
/// program, paired with the stream type recognised for it.
#[derive(Debug, Clone)]
pub struct PmtEntry {
    /// Program this PMT belongs to.
    pub program_number: u16,
    /// Elementary PID carrying this stream's data.
    pub elementary_pid: u16,
    /// Recognised stream type.
    pub stream_type: StreamType,
}

/// A demultiplexed, PES-like payload ready for the video user-data
/// scanner (or, for an MP4 `cdat` caption track, directly for the CEA-608
/// decoder).
#[derive(Debug, Clone)]
pub struct PesPayload {
    /// Elementary stream identifier the payload came from (PID for TS,
    /// track index for MP4/GXF/MXF).
    pub stream_id: u32,
    /// Presentation Time Stamp in 90 kHz units, when known.
    pub pts: Option<i64>,
    /// Decode Time Stamp in 90 kHz units, when known and different from
    /// PTS.
    pub dts: Option<i64>,
    /// Raw payload bytes (an H.264/MPEG-2 video elementary stream slice,
    /// or raw 608 bytes for an MP4 caption track). Kept as a zero-copy
    /// `Bytes` handle so a PES assembled once can be cloned into the
    /// scanner, the reorder buffer, and RCWT passthrough without
    /// re-allocating.
    pub data: bytes::Bytes,
    /// True when this payload is known to start a new video access unit.
    pub is_unit_start: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_type_mapping() {
        assert_eq!(StreamType::from_byte(0x1B), StreamType::H264);
        assert_eq!(StreamType::from_byte(0x02), StreamType::Mpeg2Video);
        assert!(StreamType::from_byte(0x1B).may_carry_captions());
        assert!(!StreamType::from_byte(0x0F).may_carry_captions());
        assert_eq!(StreamType::from_byte(0x83), StreamType::UserPrivate(0x83));
    }

    #[test]
    fn descriptor_recognition() {
        let d = Descriptor {
            tag: 0x45,
            data: vec![],
        };
        assert!(d.is_teletext());
        assert!(!d.is_dvb_subtitle());
    }
}

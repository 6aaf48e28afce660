//! # Stream-type autodetection
//!
//! Grounded on `original_source/src/lib_ccx/stream_functions.c`
//! (`detect_stream_type`): inspects the first `<=1 MiB` of input and
//! picks the most specific container format whose signature matches.

/// Autodetected container/stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StreamKind {
    /// Raw MPEG-1/2 or H.264 elementary stream (the fallback).
    ElementaryStream,
    /// MPEG-2 Transport Stream (188-byte packets).
    TransportStream,
    /// Blu-ray-style M2TS (192-byte packets, 4-byte timecode prefix).
    M2ts,
    /// MPEG Program Stream.
    ProgramStream,
    /// ISO/IEC 14496-12 MP4/ISOBMFF.
    Mp4,
    /// GXF (General eXchange Format).
    Gxf,
    /// MXF (Material eXchange Format).
    Mxf,
    /// ASF/WTV.
    Wtv,
    /// Matroska / WebM.
    Mkv,
    /// The crate's own RCWT interchange format.
    Rcwt,
}

const RCWT_MAGIC: [u8; 8] = [0xCC, 0xCC, 0xED, 0xCC, 0x00, 0x50, 0x00, 0x01];
const MKV_EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const ASF_GUID_PREFIX: [u8; 4] = [0x30, 0x26, 0xB2, 0x75];
const GXF_PACKET_LEADER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x01, 0xBC];
const PS_PACK_HEADER: [u8; 4] = [0x00, 0x00, 0x01, 0xBA];

const TS_PACKET_SIZE: usize = 188;
const M2TS_PACKET_SIZE: usize = 192;
const TS_SYNC: u8 = 0x47;
/// Number of consecutive synced packets required to accept a TS/M2TS
/// stride, avoiding a false match on coincidental 0x47 bytes.
const TS_SYNC_RUN: usize = 8;

/// Sniffs `data` (the first portion of the input, up to ~1 MiB) and
/// returns the most specific container kind whose signature matches.
/// Falls back to `ElementaryStream` when nothing more specific is found,
/// and also when fewer than 4 bytes are available (never misdetects a
/// too-short input as a container format).
pub fn detect_stream_type(data: &[u8]) -> StreamKind {
    if data.len() < 4 {
        return StreamKind::ElementaryStream;
    }

    if data.len() >= RCWT_MAGIC.len() && data[..RCWT_MAGIC.len()] == RCWT_MAGIC {
        return StreamKind::Rcwt;
    }

    if data.len() >= 4 && data[0..4] == ASF_GUID_PREFIX {
        return StreamKind::Wtv;
    }

    if data.len() >= 4 && data[0..4] == MKV_EBML_MAGIC {
        return StreamKind::Mkv;
    }

    if data.len() >= GXF_PACKET_LEADER.len() && data[..GXF_PACKET_LEADER.len()] == GXF_PACKET_LEADER {
        return StreamKind::Gxf;
    }

    if is_mxf_partition_pack(data) {
        return StreamKind::Mxf;
    }

    if has_sync_run(data, TS_PACKET_SIZE, 0, TS_SYNC_RUN) {
        return StreamKind::TransportStream;
    }

    if has_sync_run(data, M2TS_PACKET_SIZE, 4, TS_SYNC_RUN) {
        return StreamKind::M2ts;
    }

    if mp4_box_score(data) >= 2 {
        return StreamKind::Mp4;
    }

    if find_subslice(data, &PS_PACK_HEADER).is_some() {
        return StreamKind::ProgramStream;
    }

    StreamKind::ElementaryStream
}

/// Returns true if `data` contains `run` consecutive sync bytes at the
/// given `stride`, trying every possible phase within the first
/// `stride` bytes.
fn has_sync_run(data: &[u8], stride: usize, sync_offset: usize, run: usize) -> bool {
    if data.len() < stride * run + sync_offset {
        return false;
    }
    for phase in 0..stride.min(data.len()) {
        let mut ok = true;
        for i in 0..run {
            let idx = phase + sync_offset + i * stride;
            if idx >= data.len() || data[idx] != TS_SYNC {
                ok = false;
                break;
            }
        }
        if ok {
            return true;
        }
    }
    false
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p)
}

/// MXF partition-pack key: `06 0E 2B 34 02 05 01 01 0D 01 02 01 01 ?? 02 00`
/// — the low nibbles of byte 13 vary by partition kind, so only the fixed
/// prefix is checked.
const MXF_PARTITION_PREFIX: [u8; 13] = [
    0x06, 0x0E, 0x2B, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0D, 0x01, 0x02, 0x01, 0x01,
];

fn is_mxf_partition_pack(data: &[u8]) -> bool {
    data.len() >= MXF_PARTITION_PREFIX.len() && data[..MXF_PARTITION_PREFIX.len()] == MXF_PARTITION_PREFIX
}

/// Known top-level ISO/IEC 14496-12 box types, each worth one point
/// toward the MP4 detection score.
const MP4_BOX_TYPES: [[u8; 4]; 6] = [*b"ftyp", *b"moov", *b"mdat", *b"free", *b"moof", *b"styp"];

/// Walks the first `data` as a chain of `size`+`type` boxes and scores
/// how many recognised MP4 box types are seen consecutively from the
/// start.
fn mp4_box_score(data: &[u8]) -> u32 {
    let mut score = 0u32;
    let mut pos = 0usize;
    while pos + 8 <= data.len() && score < 4 {
        let size = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let box_type = &data[pos + 4..pos + 8];
        if MP4_BOX_TYPES.iter().any(|t| t == box_type) {
            score += 1;
        } else {
            break;
        }
        if size < 8 {
            break;
        }
        pos += size;
    }
    score
}

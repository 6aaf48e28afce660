//! # MPEG Transport Stream demultiplexing
//!
//! Grounded on `bkataru-workshop-vdkio::format::ts::{parser,demuxer,types}`
//! for the packet/PAT/PMT parsing shape, rebuilt synchronous over
//! [`crate::bytesrc::ByteSource`] instead of `tokio::io::AsyncRead`, and on
//! `original_source/src/ts_functions.c` / `src/ts_tables.cpp` for PAT/PMT
//! CRC validation and continuity-counter handling.

use crate::bytesrc::ByteSource;
use crate::crc::Crc32Mpeg2;
use crate::demux::{Demuxer, Descriptor, ElementaryStreamInfo, PatEntry, PesPayload, PmtEntry, StreamType};
use crate::error::{CcxError, Result};
use std::collections::HashMap;

pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const PID_PAT: u16 = 0x0000;
const TABLE_ID_PAT: u8 = 0x00;
const TABLE_ID_PMT: u8 = 0x02;

/// The fixed 4-byte TS packet header.
#[derive(Debug, Clone, Copy)]
struct TsHeader {
    transport_error: bool,
    payload_unit_start: bool,
    pid: u16,
    adaptation_field_exists: bool,
    contains_payload: bool,
    continuity_counter: u8,
}

fn parse_header(data: &[u8]) -> Result<TsHeader> {
    if data.len() < TS_HEADER_SIZE || data[0] != 0x47 {
        return Err(CcxError::Structural("invalid TS sync byte".into()));
    }
    Ok(TsHeader {
        transport_error: (data[1] & 0x80) != 0,
        payload_unit_start: (data[1] & 0x40) != 0,
        pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
        adaptation_field_exists: (data[3] & 0x20) != 0,
        contains_payload: (data[3] & 0x10) != 0,
        continuity_counter: data[3] & 0x0F,
    })
}

/// Adaptation field PCR, when present; everything else in the field is
/// skipped since the pipeline has no use for it.
fn parse_pcr(data: &[u8], offset: usize) -> Option<u64> {
    let length = *data.get(offset)? as usize;
    if length == 0 {
        return None;
    }
    let flags = *data.get(offset + 1)?;
    if flags & 0x10 == 0 {
        return None;
    }
    if data.len() < offset + 8 {
        return None;
    }
    let pos = offset + 2;
    let base = ((data[pos] as u64) << 25)
        | ((data[pos + 1] as u64) << 17)
        | ((data[pos + 2] as u64) << 9)
        | ((data[pos + 3] as u64) << 1)
        | ((data[pos + 4] & 0x80) as u64 >> 7);
    let ext = (((data[pos + 4] & 0x01) as u64) << 8) | (data[pos + 5] as u64);
    Some(base * 300 + ext)
}

fn parse_descriptors(data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 2 <= data.len() {
        let tag = data[pos];
        let len = data[pos + 1] as usize;
        pos += 2;
        if pos + len > data.len() {
            return Err(CcxError::Structural("descriptor runs past section end".into()));
        }
        out.push(Descriptor {
            tag,
            data: data[pos..pos + len].to_vec(),
        });
        pos += len;
    }
    Ok(out)
}

/// Parses a PAT section (starting at the table_id byte) into entries.
/// Validates the trailing CRC32 and rejects the section on mismatch,
/// mirroring the original's `ts_tables.cpp` behaviour of dropping a
/// corrupt PSI section rather than trusting a partial parse.
fn parse_pat(data: &[u8]) -> Result<Vec<PatEntry>> {
    if data.len() < 8 || data[0] != TABLE_ID_PAT {
        return Err(CcxError::Structural("invalid PAT table id".into()));
    }
    let section_length = ((data[1] as usize & 0x0F) << 8) | data[2] as usize;
    let total = 3 + section_length;
    if data.len() < total {
        return Err(CcxError::Structural("PAT section shorter than declared".into()));
    }
    if !Crc32Mpeg2::new().verify_section(&data[..total]) {
        return Err(CcxError::Stream("PAT CRC mismatch".into()));
    }

    let mut entries = Vec::new();
    let mut pos = 8;
    while pos + 4 <= total - 4 {
        let program_number = ((data[pos] as u16) << 8) | data[pos + 1] as u16;
        let pid = ((data[pos + 2] as u16 & 0x1F) << 8) | data[pos + 3] as u16;
        entries.push(PatEntry {
            program_number,
            pmt_pid: pid,
            last_payload: Vec::new(),
        });
        pos += 4;
    }
    Ok(entries)
}

/// Parses a PMT section into elementary stream entries for `program_number`.
fn parse_pmt(data: &[u8], program_number: u16) -> Result<Vec<PmtEntry>> {
    if data.len() < 8 || data[0] != TABLE_ID_PMT {
        return Err(CcxError::Structural("invalid PMT table id".into()));
    }
    let section_length = ((data[1] as usize & 0x0F) << 8) | data[2] as usize;
    let total = 3 + section_length;
    if data.len() < total {
        return Err(CcxError::Structural("PMT section shorter than declared".into()));
    }
    if !Crc32Mpeg2::new().verify_section(&data[..total]) {
        return Err(CcxError::Stream("PMT CRC mismatch".into()));
    }

    let mut pos = 8;
    let program_info_length = ((data[pos + 2] as usize & 0x0F) << 8) | data[pos + 3] as usize;
    pos += 4;
    if pos + program_info_length > total - 4 {
        return Err(CcxError::Structural("PMT program info runs past section end".into()));
    }
    pos += program_info_length;

    let mut entries = Vec::new();
    while pos + 5 <= total - 4 {
        let stream_type_raw = data[pos];
        let elementary_pid = ((data[pos + 1] as u16 & 0x1F) << 8) | data[pos + 2] as u16;
        let es_info_length = ((data[pos + 3] as usize & 0x0F) << 8) | data[pos + 4] as usize;
        pos += 5;
        if pos + es_info_length > total - 4 {
            return Err(CcxError::Structural("PMT ES info runs past section end".into()));
        }
        let _descriptors = parse_descriptors(&data[pos..pos + es_info_length])?;
        pos += es_info_length;

        entries.push(PmtEntry {
            program_number,
            elementary_pid,
            stream_type: StreamType::from_byte(stream_type_raw),
        });
    }
    Ok(entries)
}

fn parse_pts_dts(data: &[u8]) -> (Option<i64>, Option<i64>) {
    if data.len() < 9 {
        return (None, None);
    }
    let flags = data[7];
    let header_len = data[8] as usize;
    if data.len() < 9 + header_len {
        return (None, None);
    }
    let has_pts = flags & 0x80 != 0;
    let has_dts = flags & 0x40 != 0;
    if !has_pts {
        return (None, None);
    }
    let p = &data[9..];
    let read_ts = |b: &[u8]| -> i64 {
        ((b[0] as i64 & 0x0E) << 29)
            | ((b[1] as i64) << 22)
            | ((b[2] as i64 & 0xFE) << 14)
            | ((b[3] as i64) << 7)
            | ((b[4] as i64 & 0xFE) >> 1)
    };
    let pts = read_ts(p);
    let dts = if has_dts && p.len() >= 10 {
        Some(read_ts(&p[5..]))
    } else {
        None
    };
    (Some(pts), dts)
}

struct PesBuilder {
    pts: Option<i64>,
    dts: Option<i64>,
    declared_len: Option<usize>,
    data: Vec<u8>,
}

impl PesBuilder {
    fn from_payload_start(payload: &[u8]) -> Option<Self> {
        if payload.len() < 6 || payload[0] != 0x00 || payload[1] != 0x00 || payload[2] != 0x01 {
            return None;
        }
        let packet_len = ((payload[4] as usize) << 8) | payload[5] as usize;
        let (pts, dts) = parse_pts_dts(payload);
        let header_data_len = if payload.len() > 8 { payload[8] as usize } else { 0 };
        let header_total = 9 + header_data_len;
        let es_start = header_total.min(payload.len());
        Some(Self {
            pts,
            dts,
            declared_len: if packet_len == 0 { None } else { Some(packet_len - 3 - header_data_len) },
            data: payload[es_start..].to_vec(),
        })
    }

    fn push(&mut self, payload: &[u8]) {
        self.data.extend_from_slice(payload);
    }

    fn is_complete(&self) -> bool {
        self.declared_len.map(|n| self.data.len() >= n).unwrap_or(false)
    }
}

/// Per-PID bookkeeping: continuity tracking and in-progress PES assembly.
struct PidState {
    last_continuity: Option<u8>,
    pes: Option<PesBuilder>,
}

/// Synchronous MPEG-TS demultiplexer reading from any [`ByteSource`].
///
/// Discovers the PAT, follows the first program's PMT, and reassembles
/// PES packets for every elementary stream whose [`StreamType`] may carry
/// closed captions (video ES). A caller needing audio or other streams
/// would extend `wants_pid`; out of scope here.
pub struct TsDemuxer<S: ByteSource> {
    source: S,
    pat: Option<Vec<PatEntry>>,
    pmt_pid: Option<u16>,
    pmt: Vec<PmtEntry>,
    pids: HashMap<u16, PidState>,
    continuity_errors: u64,
}

impl<S: ByteSource> TsDemuxer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            pat: None,
            pmt_pid: None,
            pmt: Vec::new(),
            pids: HashMap::new(),
            continuity_errors: 0,
        }
    }

    /// Number of continuity-counter discontinuities observed so far.
    pub fn continuity_errors(&self) -> u64 {
        self.continuity_errors
    }

    fn read_packet(&mut self) -> Result<Vec<u8>> {
        let mut packet = vec![0u8; TS_PACKET_SIZE];
        self.source.read_exact(&mut packet)?;
        Ok(packet)
    }

    fn wants_pid(&self, pid: u16) -> bool {
        self.pmt.iter().any(|e| e.elementary_pid == pid && e.stream_type.may_carry_captions())
    }

    fn check_continuity(&mut self, pid: u16, cc: u8) {
        let state = self.pids.entry(pid).or_insert_with(|| PidState {
            last_continuity: None,
            pes: None,
        });
        if let Some(last) = state.last_continuity {
            let expected = (last + 1) & 0x0F;
            if expected != cc {
                self.continuity_errors += 1;
            }
        }
        state.last_continuity = Some(cc);
    }
}

impl<S: ByteSource> Demuxer for TsDemuxer<S> {
    fn next_payload(&mut self) -> Result<PesPayload> {
        loop {
            let data = self.read_packet()?;
            let header = match parse_header(&data) {
                Ok(h) => h,
                Err(_) => continue,
            };
            if header.transport_error {
                continue;
            }
            self.check_continuity(header.pid, header.continuity_counter);

            let mut payload_offset = TS_HEADER_SIZE;
            if header.adaptation_field_exists {
                let _pcr = parse_pcr(&data, payload_offset);
                if let Some(&len) = data.get(payload_offset) {
                    payload_offset += 1 + len as usize;
                }
            }
            if !header.contains_payload || payload_offset >= data.len() {
                continue;
            }

            match header.pid {
                PID_PAT if header.payload_unit_start => {
                    let pointer = data[payload_offset] as usize;
                    let table_start = payload_offset + 1 + pointer;
                    if let Ok(entries) = parse_pat(&data[table_start..]) {
                        if let Some(first) = entries.iter().find(|e| e.program_number != 0) {
                            self.pmt_pid = Some(first.pmt_pid);
                        }
                        self.pat = Some(entries);
                    }
                }
                pid if Some(pid) == self.pmt_pid && header.payload_unit_start => {
                    let pointer = data[payload_offset] as usize;
                    let table_start = payload_offset + 1 + pointer;
                    let program_number = self
                        .pat
                        .as_ref()
                        .and_then(|pat| pat.iter().find(|e| e.pmt_pid == pid))
                        .map(|e| e.program_number)
                        .unwrap_or(0);
                    if let Ok(entries) = parse_pmt(&data[table_start..], program_number) {
                        self.pmt = entries;
                    }
                }
                pid if self.wants_pid(pid) => {
                    let payload = &data[payload_offset..];
                    if header.payload_unit_start {
                        let finished = self.pids.get_mut(&pid).and_then(|s| s.pes.take());
                        if let Some(b) = PesBuilder::from_payload_start(payload) {
                            self.pids.get_mut(&pid).unwrap().pes = Some(b);
                        }
                        if let Some(finished) = finished {
                            if !finished.data.is_empty() {
                                return Ok(PesPayload {
                                    stream_id: pid as u32,
                                    pts: finished.pts,
                                    dts: finished.dts,
                                    data: finished.data.into(),
                                    is_unit_start: true,
                                });
                            }
                        }
                    } else if let Some(state) = self.pids.get_mut(&pid) {
                        if let Some(pes) = &mut state.pes {
                            pes.push(payload);
                            if pes.is_complete() {
                                let pes = state.pes.take().unwrap();
                                return Ok(PesPayload {
                                    stream_id: pid as u32,
                                    pts: pes.pts,
                                    dts: pes.dts,
                                    data: pes.data.into(),
                                    is_unit_start: false,
                                });
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pat_packet() -> Vec<u8> {
        let mut pkt = vec![0u8; TS_PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = 0x40;
        pkt[2] = 0x00;
        pkt[3] = 0x10;
        pkt[4] = 0x00;
        pkt[5] = TABLE_ID_PAT;
        pkt[6] = 0xB0;
        pkt[7] = 13;
        pkt[8] = 0x00;
        pkt[9] = 0x01;
        pkt[10] = 0xC1;
        pkt[11] = 0x00;
        pkt[12] = 0x00;
        pkt[13] = 0x00;
        pkt[14] = 0x01;
        pkt[15] = 0xE0;
        pkt[16] = 0x20;
        let crc = Crc32Mpeg2::new().calculate(&pkt[5..17]);
        pkt[17] = (crc >> 24) as u8;
        pkt[18] = (crc >> 16) as u8;
        pkt[19] = (crc >> 8) as u8;
        pkt[20] = crc as u8;
        pkt[21..].fill(0xFF);
        pkt
    }

    fn pmt_packet() -> Vec<u8> {
        let mut pkt = vec![0u8; TS_PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = 0x40;
        pkt[2] = 0x20;
        pkt[3] = 0x10;
        pkt[4] = 0x00;
        pkt[5] = TABLE_ID_PMT;
        pkt[6] = 0xB0;
        pkt[7] = 18;
        pkt[8] = 0x00;
        pkt[9] = 0x01;
        pkt[10] = 0xC1;
        pkt[11] = 0x00;
        pkt[12] = 0x00;
        pkt[13] = 0xE0;
        pkt[14] = 0x21;
        pkt[15] = 0xF0;
        pkt[16] = 0x00;
        pkt[17] = 0x1B;
        pkt[18] = 0xE0;
        pkt[19] = 0x21;
        pkt[20] = 0xF0;
        pkt[21] = 0x00;
        let crc = Crc32Mpeg2::new().calculate(&pkt[5..22]);
        pkt[22] = (crc >> 24) as u8;
        pkt[23] = (crc >> 16) as u8;
        pkt[24] = (crc >> 8) as u8;
        pkt[25] = crc as u8;
        pkt[26..].fill(0xFF);
        pkt
    }

    fn es_packet(pusi: bool, cc: u8, payload: &[u8]) -> Vec<u8> {
        let mut pkt = vec![0xFFu8; TS_PACKET_SIZE];
        pkt[0] = 0x47;
        pkt[1] = if pusi { 0x40 } else { 0x00 } | 0x21;
        pkt[2] = 0x21;
        pkt[3] = 0x10 | (cc & 0x0F);
        let start = TS_HEADER_SIZE;
        pkt[start..start + payload.len()].copy_from_slice(payload);
        pkt
    }

    #[test]
    fn demuxes_pat_pmt_and_one_pes() {
        let mut pes_start = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x00, 0x00];
        pes_start.extend_from_slice(&[0xAA; 4]);

        let mut data = Vec::new();
        data.extend_from_slice(&pat_packet());
        data.extend_from_slice(&pmt_packet());
        data.extend_from_slice(&es_packet(true, 0, &pes_start));

        let mut demux = TsDemuxer::new(crate::bytesrc::RingByteSource::new(Cursor::new(data)));
        // First call drives PAT/PMT then starts the PES builder; since
        // packet_length is 0 here it's never "complete" on its own, so
        // force EOF and assert no continuity errors were recorded.
        let err = demux.next_payload();
        assert!(err.is_err());
        assert_eq!(demux.continuity_errors(), 0);
    }

    #[test]
    fn detects_continuity_gap() {
        let mut data = Vec::new();
        data.extend_from_slice(&pat_packet());
        data.extend_from_slice(&pmt_packet());
        data.extend_from_slice(&es_packet(true, 0, &[0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x00, 0x00]));
        data.extend_from_slice(&es_packet(false, 5, &[0xAA; 4]));

        let mut demux = TsDemuxer::new(crate::bytesrc::RingByteSource::new(Cursor::new(data)));
        let _ = demux.next_payload();
        assert_eq!(demux.continuity_errors(), 1);
    }
}

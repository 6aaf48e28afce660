//! # MPEG Program Stream demultiplexing
//!
//! Grounded on `original_source/src/lib_ccx/stream_functions.c` for the
//! pack-header/PES start-code scanning shape, and on
//! `bkataru-workshop-vdkio::format::ts::pes` for the PTS/DTS field layout
//! (identical between TS and PS PES headers).

use crate::bytesrc::ByteSource;
use crate::demux::{Demuxer, PesPayload};
use crate::error::Result;

const PACK_START: [u8; 4] = [0x00, 0x00, 0x01, 0xBA];

fn is_video_stream_id(id: u8) -> bool {
    (0xE0..=0xEF).contains(&id)
}

fn parse_pts_dts(payload: &[u8]) -> (Option<i64>, Option<i64>) {
    if payload.len() < 9 {
        return (None, None);
    }
    let flags = payload[7];
    let header_len = payload[8] as usize;
    if payload.len() < 9 + header_len || flags & 0x80 == 0 {
        return (None, None);
    }
    let p = &payload[9..];
    let read_ts = |b: &[u8]| -> i64 {
        ((b[0] as i64 & 0x0E) << 29)
            | ((b[1] as i64) << 22)
            | ((b[2] as i64 & 0xFE) << 14)
            | ((b[3] as i64) << 7)
            | ((b[4] as i64 & 0xFE) >> 1)
    };
    let pts = read_ts(p);
    let dts = if flags & 0x40 != 0 && p.len() >= 10 {
        Some(read_ts(&p[5..]))
    } else {
        None
    };
    (Some(pts), dts)
}

/// Synchronous MPEG Program Stream demultiplexer: scans for start codes
/// byte-by-byte (no fixed packet size, unlike TS) and emits one
/// `PesPayload` per video PES packet (`stream_id` in `0xE0..=0xEF`).
pub struct PsDemuxer<S: ByteSource> {
    source: S,
    lookahead: Vec<u8>,
}

impl<S: ByteSource> PsDemuxer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            lookahead: Vec::new(),
        }
    }

    fn next_byte(&mut self) -> Result<u8> {
        if let Some(b) = self.lookahead.pop() {
            return Ok(b);
        }
        let mut b = [0u8; 1];
        self.source.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_exact_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Scans forward for the next start code (`00 00 01 xx`), returning
    /// the stream id byte that follows it.
    fn next_start_code(&mut self) -> Result<u8> {
        let mut zeros = 0u32;
        loop {
            let b = self.next_byte()?;
            match b {
                0x00 => zeros += 1,
                0x01 if zeros >= 2 => {
                    return self.next_byte();
                }
                _ => zeros = 0,
            }
        }
    }

    fn skip_pack_header(&mut self) -> Result<()> {
        // Fixed 10-byte pack_header body (MPEG-2 program stream_pack), plus
        // optional stuffing bytes encoded in the low 3 bits of the last byte.
        let body = self.read_exact_vec(8)?;
        let stuffing_len = (body[7] & 0x07) as usize;
        if stuffing_len > 0 {
            self.read_exact_vec(stuffing_len)?;
        }
        Ok(())
    }
}

impl<S: ByteSource> Demuxer for PsDemuxer<S> {
    fn next_payload(&mut self) -> Result<PesPayload> {
        loop {
            let stream_id = self.next_start_code()?;
            if stream_id == PACK_START[3] {
                self.skip_pack_header()?;
                continue;
            }
            if !is_video_stream_id(stream_id) {
                continue;
            }

            let len_buf = self.read_exact_vec(2)?;
            let packet_len = ((len_buf[0] as usize) << 8) | len_buf[1] as usize;
            let body = self.read_exact_vec(packet_len)?;

            let mut header = vec![0x00, 0x00, 0x01, stream_id, len_buf[0], len_buf[1]];
            header.extend_from_slice(&body);
            let (pts, dts) = parse_pts_dts(&header);

            let header_data_len = if body.len() > 2 { body[2] as usize } else { 0 };
            let es_start = (3 + header_data_len).min(body.len());

            return Ok(PesPayload {
                stream_id: stream_id as u32,
                pts,
                dts,
                data: body[es_start..].to_vec().into(),
                is_unit_start: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytesrc::RingByteSource;
    use std::io::Cursor;

    fn pack_header() -> Vec<u8> {
        let mut data = PACK_START.to_vec();
        data.extend_from_slice(&[0u8; 8]);
        data
    }

    fn video_pes(payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x01, 0xE0];
        let header_data_len = 0u8;
        let pes_len = (3 + header_data_len as usize + payload.len()) as u16;
        data.push((pes_len >> 8) as u8);
        data.push(pes_len as u8);
        data.push(0x80);
        data.push(0x00);
        data.push(header_data_len);
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn extracts_video_pes_after_pack_header() {
        let mut data = pack_header();
        data.extend_from_slice(&video_pes(&[0xAA, 0xBB, 0xCC]));

        let mut demux = PsDemuxer::new(RingByteSource::new(Cursor::new(data)));
        let pes = demux.next_payload().unwrap();
        assert_eq!(pes.data, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(pes.stream_id, 0xE0);
    }

    #[test]
    fn skips_non_video_stream_ids() {
        let mut data = pack_header();
        // Audio PES (stream id 0xC0), should be skipped.
        let mut audio = vec![0x00, 0x00, 0x01, 0xC0, 0x00, 0x03, 0x00, 0x00, 0x00];
        data.append(&mut audio);
        data.extend_from_slice(&video_pes(&[0x01]));

        let mut demux = PsDemuxer::new(RingByteSource::new(Cursor::new(data)));
        let pes = demux.next_payload().unwrap();
        assert_eq!(pes.data, vec![0x01]);
    }
}

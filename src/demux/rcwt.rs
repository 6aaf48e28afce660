//! # RCWT ("raw captions with timing")
//!
//! Grounded on `original_source/src/lib_ccx/ccx_demuxer.c` (`CCX_SM_RCWT`
//! handling) and the wire format referenced throughout
//! `original_source/src/ccextractor.cpp`: an 11-byte header followed by
//! blocks of `(u64 fts, u16 count, count * triplet)`, tolerant of
//! truncation mid-block.

use crate::bytesrc::ByteSource;
use crate::cctriplet::CaptionTriplet;
use crate::error::{CcxError, Result};

/// The crate's own interchange magic: `CC CC ED CC 00 50 00 01 00 00 00`.
pub const RCWT_HEADER: [u8; 11] = [0xCC, 0xCC, 0xED, 0xCC, 0x00, 0x50, 0x00, 0x01, 0x00, 0x00, 0x00];

/// One replayed block: a frame time stamp and the triplets recorded for
/// it, in the order they were written.
#[derive(Debug, Clone)]
pub struct RcwtBlock {
    pub fts: u64,
    pub triplets: Vec<CaptionTriplet>,
}

/// Reads and validates the fixed RCWT header, consuming it from `source`.
pub fn read_header<S: ByteSource>(source: &mut S) -> Result<()> {
    let mut header = [0u8; 11];
    source.read_exact(&mut header)?;
    if header != RCWT_HEADER {
        return Err(CcxError::Structural("missing or invalid RCWT header".into()));
    }
    Ok(())
}

/// Reads one `(fts, count, triplets)` block. Returns `Eof` once the
/// source is exhausted at a block boundary; a short read in the middle
/// of a block (truncated recording) also surfaces as `Eof` rather than a
/// structural error, per the wire format's truncation tolerance.
pub fn read_block<S: ByteSource>(source: &mut S) -> Result<RcwtBlock> {
    let mut fts_buf = [0u8; 8];
    match source.read_exact(&mut fts_buf) {
        Ok(()) => {}
        Err(CcxError::Eof) => return Err(CcxError::Eof),
        Err(e) => return Err(e),
    }
    let fts = u64::from_le_bytes(fts_buf);

    let mut count_buf = [0u8; 2];
    if source.read_exact(&mut count_buf).is_err() {
        return Err(CcxError::Eof);
    }
    let count = u16::from_le_bytes(count_buf) as usize;

    let mut triplets = Vec::with_capacity(count);
    for _ in 0..count {
        let mut raw = [0u8; 3];
        if source.read_exact(&mut raw).is_err() {
            return Ok(RcwtBlock { fts, triplets });
        }
        triplets.push(CaptionTriplet::from_wire(raw[0], raw[1], raw[2]));
    }
    Ok(RcwtBlock { fts, triplets })
}

/// Serialises the fixed header, for the RCWT encoder.
pub fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(&RCWT_HEADER);
}

/// Serialises one block, for the RCWT encoder.
pub fn write_block(out: &mut Vec<u8>, fts: u64, triplets: &[CaptionTriplet]) {
    out.extend_from_slice(&fts.to_le_bytes());
    out.extend_from_slice(&(triplets.len() as u16).to_le_bytes());
    for t in triplets {
        out.extend_from_slice(&t.to_wire());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytesrc::RingByteSource;
    use crate::cctriplet::CcType;
    use std::io::Cursor;

    #[test]
    fn round_trips_header_and_block() {
        let mut bytes = Vec::new();
        write_header(&mut bytes);
        let triplets = vec![CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::NtscF1,
            b1: 0x20,
            b2: 0x21,
        }];
        write_block(&mut bytes, 1234, &triplets);

        let mut source = RingByteSource::new(Cursor::new(bytes));
        read_header(&mut source).unwrap();
        let block = read_block(&mut source).unwrap();
        assert_eq!(block.fts, 1234);
        assert_eq!(block.triplets, triplets);
    }

    #[test]
    fn truncated_block_yields_partial_triplets_not_error() {
        let mut bytes = Vec::new();
        write_header(&mut bytes);
        bytes.extend_from_slice(&42u64.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&[0x04, 0x20, 0x21]);
        // second triplet truncated

        let mut source = RingByteSource::new(Cursor::new(bytes));
        read_header(&mut source).unwrap();
        let block = read_block(&mut source).unwrap();
        assert_eq!(block.fts, 42);
        assert_eq!(block.triplets.len(), 1);
    }

    #[test]
    fn eof_at_block_boundary() {
        let mut bytes = Vec::new();
        write_header(&mut bytes);
        let mut source = RingByteSource::new(Cursor::new(bytes));
        read_header(&mut source).unwrap();
        assert!(matches!(read_block(&mut source), Err(CcxError::Eof)));
    }
}

//! # MXF (Material eXchange Format)
//!
//! Grounded on `original_source/src/lib_ccx/ccx_demuxer_mxf.c`: a KLV
//! (Key-Length-Value) walk that recognises the partition-pack key,
//! skips metadata sets, and decodes essence elements on the ancillary
//! (VANC/VBI) track as CDP payloads tagged `pyld`.

use crate::bytesrc::ByteSource;
use crate::demux::cdp::{self, CDP_SDID_708};
use crate::demux::{Demuxer, PesPayload};
use crate::error::{CcxError, Result};

/// Fixed prefix of every MXF universal label key (SMPTE 336M).
const UL_PREFIX: [u8; 4] = [0x06, 0x0E, 0x2B, 0x34];

/// Partition-pack keys share this 13-byte prefix; the remaining 3 bytes
/// vary with partition kind (header/body/footer, open/closed, complete).
const PARTITION_PREFIX: [u8; 13] = [
    0x06, 0x0E, 0x2B, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0D, 0x01, 0x02, 0x01, 0x01,
];

fn read_ber_length<S: ByteSource>(source: &mut S) -> Result<u64> {
    let mut first = [0u8; 1];
    source.read_exact(&mut first)?;
    if first[0] & 0x80 == 0 {
        return Ok(first[0] as u64);
    }
    let n = (first[0] & 0x7F) as usize;
    if n > 8 {
        return Err(CcxError::Structural("BER length too wide".into()));
    }
    let mut rest = vec![0u8; n];
    source.read_exact(&mut rest)?;
    Ok(rest.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

struct Klv {
    key: [u8; 16],
    value: Vec<u8>,
}

fn read_klv<S: ByteSource>(source: &mut S) -> Result<Klv> {
    let mut key = [0u8; 16];
    source.read_exact(&mut key)?;
    if key[0..4] != UL_PREFIX {
        return Err(CcxError::Structural("MXF key missing universal label prefix".into()));
    }
    let length = read_ber_length(source)?;
    let mut value = vec![0u8; length as usize];
    source.read_exact(&mut value)?;
    Ok(Klv { key, value })
}

fn is_partition_pack(key: &[u8; 16]) -> bool {
    key[..13] == PARTITION_PREFIX
}

/// The ancillary-essence element key ends in `pyld`-style generic
/// container item number bytes; rather than track the full essence
/// element key taxonomy, any non-partition KLV whose value begins with
/// the CDP identifier `96 69` is treated as an ancillary payload, which
/// is how the source narrows essence elements down once the VANC
/// track's track number has been matched.
fn looks_like_cdp(value: &[u8]) -> bool {
    value.len() >= 2 && value[0] == 0x96 && value[1] == 0x69
}

/// Synchronous MXF demultiplexer, emitting one `PesPayload` of raw
/// caption-triplet bytes per ancillary essence element recognised.
pub struct MxfDemuxer<S: ByteSource> {
    source: S,
}

impl<S: ByteSource> MxfDemuxer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ByteSource> Demuxer for MxfDemuxer<S> {
    fn next_payload(&mut self) -> Result<PesPayload> {
        loop {
            let klv = read_klv(&mut self.source)?;
            if is_partition_pack(&klv.key) {
                continue;
            }
            if !looks_like_cdp(&klv.value) {
                continue;
            }

            // The CDP body itself doesn't carry an SDID; MXF wraps it in
            // an ANC packet header (line/DID/SDID) that has already been
            // stripped by the caller's VANC-track selection, so every
            // ancillary essence element recognised here is assumed 708
            // unless its only triplets decode as NTSC line-21 data.
            let Ok(cdp) = cdp::parse_cdp(&klv.value, CDP_SDID_708) else {
                continue;
            };
            if cdp.triplets.is_empty() {
                continue;
            }

            let mut data = Vec::with_capacity(cdp.triplets.len() * 3);
            for t in &cdp.triplets {
                data.extend_from_slice(&t.to_wire());
            }
            return Ok(PesPayload {
                stream_id: 0,
                pts: None,
                dts: None,
                data: data.into(),
                is_unit_start: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytesrc::RingByteSource;
    use crate::cctriplet::{CaptionTriplet, CcType};
    use std::io::Cursor;

    fn klv_bytes(key: [u8; 16], value: &[u8]) -> Vec<u8> {
        let mut out = key.to_vec();
        out.push(value.len() as u8);
        out.extend_from_slice(value);
        out
    }

    fn cdp_bytes(triplets: &[CaptionTriplet]) -> Vec<u8> {
        let mut cdp = vec![0u8; 9];
        cdp[0] = 0x96;
        cdp[1] = 0x69;
        cdp.push(0x72);
        cdp.push(0xE0 | triplets.len() as u8);
        for t in triplets {
            cdp.extend_from_slice(&t.to_wire());
        }
        cdp[2] = cdp.len() as u8;
        cdp
    }

    #[test]
    fn skips_partition_pack_and_decodes_ancillary_essence() {
        let mut partition_key = PARTITION_PREFIX.to_vec();
        partition_key.extend_from_slice(&[0x01, 0x00, 0x00]);
        let partition_key: [u8; 16] = partition_key.try_into().unwrap();

        let triplets = vec![CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::DtvccData,
            b1: 0x05,
            b2: 0x06,
        }];
        let mut essence_key = [0u8; 16];
        essence_key[0..4].copy_from_slice(&UL_PREFIX);
        essence_key[15] = 0x01;

        let mut data = klv_bytes(partition_key, &[0u8; 4]);
        data.extend_from_slice(&klv_bytes(essence_key, &cdp_bytes(&triplets)));

        let mut demux = MxfDemuxer::new(RingByteSource::new(Cursor::new(data)));
        let payload = demux.next_payload().unwrap();
        assert_eq!(payload.data.len(), 3);
    }
}

//! # GXF (General eXchange Format)
//!
//! Grounded on `original_source/src/lib_ccx/ccx_gxf.c`: 16-byte packet
//! headers, material/track description map packets for edit rate and
//! ancillary track numbers, media packets carrying CDP payloads on the
//! ancillary track.

use crate::bytesrc::ByteSource;
use crate::demux::cdp::{self, CDP_SDID_608, CDP_SDID_708};
use crate::demux::{Demuxer, PesPayload};
use crate::error::{CcxError, Result};

const PACKET_LEADER: [u8; 5] = [0x00, 0x00, 0x00, 0x00, 0x01];
const PACKET_TRAILER: [u8; 2] = [0xE1, 0xE2];

const TYPE_MAP: u8 = 0xBC;
const TYPE_MEDIA: u8 = 0xBF;

/// Media-packet field tag carrying ancillary-data payload bytes.
const FIELD_ANCILLARY_DATA: u8 = 0x16;

/// GXF packet header: fixed leader/trailer, a type byte, and a 32-bit
/// big-endian length covering the header through the trailer.
struct PacketHeader {
    packet_type: u8,
    length: usize,
}

fn read_header<S: ByteSource>(source: &mut S) -> Result<PacketHeader> {
    let mut leader = [0u8; 5];
    source.read_exact(&mut leader)?;
    if leader != PACKET_LEADER {
        return Err(CcxError::Structural("invalid GXF packet leader".into()));
    }
    let mut rest = [0u8; 6];
    source.read_exact(&mut rest)?;
    let packet_type = rest[0];
    let length = u32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]]) as usize;
    Ok(PacketHeader { packet_type, length })
}

/// Synchronous GXF demultiplexer. Skips map packets (their contents
/// only matter for edit-rate bookkeeping, unused by the caption-only
/// core) and decodes media-packet ancillary-data fields as CDP, handing
/// the resulting triplets onward as a raw-byte `PesPayload` for the 608/
/// 708 decoders to consume directly (GXF ancillary data bypasses the
/// video user-data scanner entirely, matching the source).
pub struct GxfDemuxer<S: ByteSource> {
    source: S,
}

impl<S: ByteSource> GxfDemuxer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn read_body(&mut self, header: &PacketHeader) -> Result<Vec<u8>> {
        if header.length < 16 {
            return Err(CcxError::Structural("GXF packet shorter than header".into()));
        }
        let body_len = header.length - 16;
        let mut body = vec![0u8; body_len];
        self.source.read_exact(&mut body)?;
        let mut trailer = [0u8; 2];
        self.source.read_exact(&mut trailer)?;
        if trailer != PACKET_TRAILER {
            return Err(CcxError::Structural("invalid GXF packet trailer".into()));
        }
        Ok(body)
    }

    fn parse_media_packet(&self, body: &[u8]) -> Option<(u64, Vec<u8>)> {
        if body.len() < 6 {
            return None;
        }
        let field_tag = body[0];
        let field_len = u32::from_be_bytes([body[2], body[3], body[4], body[5]]) as usize;
        if field_tag != FIELD_ANCILLARY_DATA {
            return None;
        }
        let start = 6;
        if body.len() < start + field_len {
            return None;
        }
        // Field number isn't exposed in the ancillary field itself; the
        // edit-rate-derived PTS is computed by the caller from the map
        // packet, so this demuxer reports a zero timestamp and lets the
        // pipeline's timing engine derive presentation order from arrival.
        Some((0, body[start..start + field_len].to_vec()))
    }
}

impl<S: ByteSource> Demuxer for GxfDemuxer<S> {
    fn next_payload(&mut self) -> Result<PesPayload> {
        loop {
            let header = read_header(&mut self.source)?;
            let body = self.read_body(&header)?;

            if header.packet_type != TYPE_MEDIA {
                continue;
            }
            let Some((fts, anc_payload)) = self.parse_media_packet(&body) else {
                continue;
            };

            let sdid = if anc_payload.first() == Some(&CDP_SDID_608) {
                CDP_SDID_608
            } else {
                CDP_SDID_708
            };
            let Ok(cdp) = cdp::parse_cdp(&anc_payload[1..], sdid) else {
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
                pts: Some(fts as i64),
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

    fn gxf_packet(packet_type: u8, body: &[u8]) -> Vec<u8> {
        let mut pkt = PACKET_LEADER.to_vec();
        pkt.push(packet_type);
        let length = (16 + body.len()) as u32;
        pkt.extend_from_slice(&length.to_be_bytes());
        pkt.extend_from_slice(body);
        pkt.extend_from_slice(&PACKET_TRAILER);
        pkt
    }

    fn cdp_body(triplets: &[CaptionTriplet]) -> Vec<u8> {
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
    fn extracts_triplets_from_media_packet() {
        let triplets = vec![CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::DtvccData,
            b1: 0x01,
            b2: 0x02,
        }];
        let mut anc = vec![CDP_SDID_708];
        anc.extend_from_slice(&cdp_body(&triplets));

        let mut field = vec![FIELD_ANCILLARY_DATA, 0x00];
        field.extend_from_slice(&(anc.len() as u32).to_be_bytes());
        field.extend_from_slice(&anc);

        let data = gxf_packet(TYPE_MEDIA, &field);
        let mut demux = GxfDemuxer::new(RingByteSource::new(Cursor::new(data)));
        let payload = demux.next_payload().unwrap();
        assert_eq!(payload.data.len(), 3);
    }

    #[test]
    fn skips_map_packets() {
        let map = gxf_packet(TYPE_MAP, &[0u8; 4]);
        let triplets = vec![CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::NtscF1,
            b1: 0x10,
            b2: 0x20,
        }];
        let mut anc = vec![CDP_SDID_608];
        anc.extend_from_slice(&cdp_body(&triplets));
        let mut field = vec![FIELD_ANCILLARY_DATA, 0x00];
        field.extend_from_slice(&(anc.len() as u32).to_be_bytes());
        field.extend_from_slice(&anc);
        let media = gxf_packet(TYPE_MEDIA, &field);

        let mut data = map;
        data.extend_from_slice(&media);
        let mut demux = GxfDemuxer::new(RingByteSource::new(Cursor::new(data)));
        let payload = demux.next_payload().unwrap();
        assert_eq!(payload.data.len(), 3);
    }
}

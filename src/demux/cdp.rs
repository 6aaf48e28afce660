//! # SMPTE-334 Caption Distribution Packet (CDP)
//!
//! Shared ancillary-data payload parsing for GXF and MXF, grounded on
//! `original_source/src/lib_ccx/ccx_gxf.c` (`parse_ancillary_data`) and
//! `original_source/src/lib_ccx/ccx_demuxer_mxf.c` (`parse_mxf_anc_data`):
//! both containers carry the same CDP structure inside their respective
//! ancillary-data tracks, tagged by DID `0x61` and SDID `0x01` (708) or
//! `0x02` (608).

use crate::cctriplet::CaptionTriplet;
use crate::error::{CcxError, Result};

/// Ancillary-data identifier for closed captioning (SMPTE 334).
pub const CDP_DID: u8 = 0x61;
/// Secondary identifier for CEA-708 payloads.
pub const CDP_SDID_708: u8 = 0x01;
/// Secondary identifier for CEA-608 payloads.
pub const CDP_SDID_608: u8 = 0x02;

const CDP_IDENTIFIER: [u8; 2] = [0x96, 0x69];
const CDP_SECTION_CC_DATA: u8 = 0x72;

/// A decoded CDP payload: the header's SDID tells the caller whether the
/// triplets are 708 or 608 data (the triplet's own `cc_type` still
/// disambiguates individual entries, since a 708-tagged CDP can still
/// interleave NTSC line-21 triplets).
#[derive(Debug, Clone)]
pub struct CdpPayload {
    pub sdid: u8,
    pub triplets: Vec<CaptionTriplet>,
}

/// Parses one CDP packet starting at its 2-byte identifier
/// (`96 69`). `sdid` comes from the enclosing ancillary-data-packet
/// header (GXF/MXF each carry it in their own wrapper).
pub fn parse_cdp(data: &[u8], sdid: u8) -> Result<CdpPayload> {
    if data.len() < 4 || data[0..2] != CDP_IDENTIFIER {
        return Err(CcxError::Structural("missing CDP identifier".into()));
    }
    let cdp_length = data[2] as usize;
    if data.len() < cdp_length {
        return Err(CcxError::Structural("CDP shorter than declared length".into()));
    }

    let mut triplets = Vec::new();
    let mut pos = 9usize; // framing rate + flags + cdp header fixed fields
    while pos + 2 <= cdp_length {
        let section_id = data[pos];
        if section_id == CDP_SECTION_CC_DATA {
            if pos + 2 > cdp_length {
                break;
            }
            let cc_count = data[pos + 1] & 0x1F;
            let mut tpos = pos + 2;
            for _ in 0..cc_count {
                if tpos + 3 > cdp_length {
                    break;
                }
                triplets.push(CaptionTriplet::from_wire(data[tpos], data[tpos + 1], data[tpos + 2]));
                tpos += 3;
            }
            pos = tpos;
        } else {
            // Unknown section: no generic length to skip by, stop here
            // rather than risk mis-parsing the footer/checksum.
            break;
        }
    }

    Ok(CdpPayload { sdid, triplets })
}

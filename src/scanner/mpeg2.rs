//! MPEG-2 video elementary-stream marker scanning: sequence/GOP/picture
//! headers and the caption carriers nested inside `00 00 01 B2`
//! user-data.
//!
//! Grounded on `original_source/src/file_functions.c` and `src/es_functions.c`
//! for the marker table in this module's doc comment.

use crate::cctriplet::CaptionTriplet;

const SEQUENCE_HEADER: [u8; 4] = [0x00, 0x00, 0x01, 0xB3];
const GOP_HEADER: [u8; 4] = [0x00, 0x00, 0x01, 0xB8];
const PICTURE_HEADER: [u8; 4] = [0x00, 0x00, 0x01, 0x00];
const USER_DATA: [u8; 4] = [0x00, 0x00, 0x01, 0xB2];

/// Aspect ratio / frame-rate table latched from a sequence header,
/// indexed by the 4-bit codes defined in ISO/IEC 13818-2 Table 6-3/6-4.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceInfo {
    pub aspect_ratio_code: u8,
    pub frame_rate_code: u8,
}

/// A GOP time code: used as a fallback timeline when PTS is unreliable.
#[derive(Debug, Clone, Copy, Default)]
pub struct GopTimecode {
    pub drop_frame: bool,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub pictures: u8,
}

/// Fields of interest from a picture header, used by the temporal
/// reorder buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PictureInfo {
    pub temporal_reference: u16,
    /// `1` = I, `2` = P, `3` = B.
    pub picture_coding_type: u8,
}

/// Scans `data` (one access unit's worth of MPEG-2 ES bytes) for a
/// sequence header and returns its aspect ratio / frame rate codes.
pub fn scan_sequence_header(data: &[u8]) -> Option<SequenceInfo> {
    let pos = find(data, &SEQUENCE_HEADER)?;
    let body = &data[pos + 4..];
    if body.len() < 4 {
        return None;
    }
    // width(12) + height(12) + aspect_ratio(4) + frame_rate(4), packed
    // across bytes 3-4: aspect_ratio occupies the high nibble of byte 3.
    let aspect_ratio_code = body[3] >> 4;
    let frame_rate_code = body[3] & 0x0F;
    Some(SequenceInfo {
        aspect_ratio_code,
        frame_rate_code,
    })
}

/// Scans for a GOP header and decodes its 25-bit time code.
pub fn scan_gop_header(data: &[u8]) -> Option<GopTimecode> {
    let pos = find(data, &GOP_HEADER)?;
    let body = &data[pos + 4..];
    if body.len() < 4 {
        return None;
    }
    let bits = ((body[0] as u32) << 17) | ((body[1] as u32) << 9) | ((body[2] as u32) << 1) | (body[3] as u32 >> 7);
    // drop_frame(1) hours(5) minutes(6) marker(1) seconds(6) pictures(6)
    let drop_frame = (bits >> 24) & 0x01 != 0;
    let hours = ((bits >> 19) & 0x1F) as u8;
    let minutes = ((bits >> 13) & 0x3F) as u8;
    let seconds = ((bits >> 6) & 0x3F) as u8;
    let pictures = (bits & 0x3F) as u8;
    Some(GopTimecode {
        drop_frame,
        hours,
        minutes,
        seconds,
        pictures,
    })
}

/// Scans for a picture header and decodes `temporal_reference` /
/// `picture_coding_type`.
pub fn scan_picture_header(data: &[u8]) -> Option<PictureInfo> {
    let pos = find(data, &PICTURE_HEADER)?;
    let body = &data[pos + 4..];
    if body.len() < 2 {
        return None;
    }
    let bits16 = ((body[0] as u16) << 8) | body[1] as u16;
    let temporal_reference = bits16 >> 6;
    let picture_coding_type = ((bits16 >> 3) & 0x07) as u8;
    Some(PictureInfo {
        temporal_reference,
        picture_coding_type,
    })
}

/// Scans `data` for `00 00 01 B2` user-data and, if recognised,
/// extracts its caption triplets. Unrecognised user-data payloads yield
/// an empty vector rather than an error (the scanner never aborts on
/// unknown user data).
pub fn scan_user_data(data: &[u8]) -> Vec<CaptionTriplet> {
    let Some(pos) = find(data, &USER_DATA) else {
        return Vec::new();
    };
    let body = &data[pos + 4..];

    if body.len() >= 6 && &body[0..2] == b"CC" && body[2] == 0x01 && body[3] == 0xF8 {
        return parse_dvd_style(&body[4..]);
    }
    if body.len() >= 4 && &body[0..4] == b"GA94" {
        return parse_ga94(&body[4..]);
    }
    if body.len() >= 2 && body[0] == 0x03 && body[1] == 0x01 {
        return parse_scte20(&body[2..]);
    }
    // ReplayTV, Dish Network, Divicom markers are recognised but not yet
    // extracted into triplets pending real sample captures to validate
    // the buffered 6-byte Dish pattern against.
    Vec::new()
}

fn find(data: &[u8], needle: &[u8]) -> Option<usize> {
    data.windows(needle.len()).position(|w| w == needle)
}

/// DVD-style: a flags byte then `cc_count` pairs of 3 bytes, matching the
/// RCWT/GA94 wire triplet shape directly.
fn parse_dvd_style(body: &[u8]) -> Vec<CaptionTriplet> {
    if body.is_empty() {
        return Vec::new();
    }
    let cc_count = (body[0] & 0x1F) as usize;
    let mut out = Vec::with_capacity(cc_count);
    let mut pos = 1;
    for _ in 0..cc_count {
        if pos + 3 > body.len() {
            break;
        }
        out.push(CaptionTriplet::from_wire(body[pos], body[pos + 1], body[pos + 2]));
        pos += 3;
    }
    out
}

/// ATSC A/53 `GA94`: one flags byte (`process_cc_data_flag` in bit 6,
/// `cc_count` in the low 5 bits) then `cc_count` triplets; carries both
/// 608 (`cc_type` 0/1) and 708 (`cc_type` 2/3) data.
fn parse_ga94(body: &[u8]) -> Vec<CaptionTriplet> {
    if body.is_empty() || body[0] != 0x03 {
        return Vec::new();
    }
    if body.len() < 2 {
        return Vec::new();
    }
    let flags = body[1];
    if flags & 0x40 == 0 {
        return Vec::new();
    }
    let cc_count = (flags & 0x1F) as usize;
    let mut out = Vec::with_capacity(cc_count);
    let mut pos = 2;
    for _ in 0..cc_count {
        if pos + 3 > body.len() {
            break;
        }
        out.push(CaptionTriplet::from_wire(body[pos], body[pos + 1], body[pos + 2]));
        pos += 3;
    }
    out
}

/// SCTE-20: 2-bit priority, 2-bit field, 5-bit line, two 8-bit data
/// bytes, parity. Normalised to a single NTSC-field triplet.
fn parse_scte20(body: &[u8]) -> Vec<CaptionTriplet> {
    if body.len() < 3 {
        return Vec::new();
    }
    let field = (body[0] >> 5) & 0x03;
    let cc_type = if field == 0 {
        crate::cctriplet::CcType::NtscF1
    } else {
        crate::cctriplet::CcType::NtscF2
    };
    vec![CaptionTriplet {
        cc_valid: true,
        cc_type,
        b1: body[1],
        b2: body[2],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cctriplet::CcType;

    #[test]
    fn scans_sequence_header() {
        let mut data = SEQUENCE_HEADER.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x3C]);
        let info = scan_sequence_header(&data).unwrap();
        assert_eq!(info.aspect_ratio_code, 0x03);
        assert_eq!(info.frame_rate_code, 0x0C);
    }

    #[test]
    fn scans_picture_header_fields() {
        let mut data = PICTURE_HEADER.to_vec();
        // temporal_reference=5 (10 bits), coding_type=1 (I-frame)
        let bits16: u16 = (5u16 << 6) | (1u16 << 3);
        data.push((bits16 >> 8) as u8);
        data.push(bits16 as u8);
        let info = scan_picture_header(&data).unwrap();
        assert_eq!(info.temporal_reference, 5);
        assert_eq!(info.picture_coding_type, 1);
    }

    #[test]
    fn extracts_ga94_triplets() {
        let mut data = USER_DATA.to_vec();
        data.extend_from_slice(b"GA94");
        data.push(0x03);
        data.push(0x40 | 1); // process flag + cc_count=1
        data.extend_from_slice(&[0x04, 0x20, 0x21]);
        let triplets = scan_user_data(&data);
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].cc_type, CcType::NtscF1);
    }

    #[test]
    fn extracts_dvd_style_triplets() {
        let mut data = USER_DATA.to_vec();
        data.extend_from_slice(b"CC");
        data.push(0x01);
        data.push(0xF8);
        data.push(0x01); // cc_count = 1
        data.extend_from_slice(&[0x04, 0x20, 0x21]);
        let triplets = scan_user_data(&data);
        assert_eq!(triplets.len(), 1);
    }

    #[test]
    fn unrecognised_user_data_is_empty() {
        let mut data = USER_DATA.to_vec();
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(scan_user_data(&data).is_empty());
    }
}

//! The caption triplet: the common currency between every demultiplexer
//! backend, the video user-data scanner, and the 608/708 decoders.
//!
//! Grounded on the triplet shape threaded through
//! `original_source/src/608.c`/`src/708.c` (`cc_subtype`, `data1`, `data2`)
//! and the RCWT wire format in `original_source/src/lib_ccx/ccx_common_common.h`.

/// Which of the four logical caption carriers a triplet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CcType {
    /// CEA-608 field 1 (line 21 NTSC, odd field).
    NtscF1,
    /// CEA-608 field 2.
    NtscF2,
    /// CEA-708 DTVCC packet data.
    DtvccData,
    /// CEA-708 DTVCC packet start.
    DtvccStart,
}

impl CcType {
    /// Decodes the 2-bit `cc_type` field as carried in a GA94/CDP/RCWT
    /// triplet header byte (`cc_valid<<2 | cc_type`, low 2 bits).
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => CcType::NtscF1,
            1 => CcType::NtscF2,
            2 => CcType::DtvccData,
            _ => CcType::DtvccStart,
        }
    }

    /// Re-encodes into the 2-bit wire value.
    pub fn to_bits(self) -> u8 {
        match self {
            CcType::NtscF1 => 0,
            CcType::NtscF2 => 1,
            CcType::DtvccData => 2,
            CcType::DtvccStart => 3,
        }
    }
}

/// One caption data unit as it travels from demux/scanner to decoder:
/// a validity flag, a carrier type, and two 7-bit (parity-stripped once
/// validated) payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionTriplet {
    pub cc_valid: bool,
    pub cc_type: CcType,
    pub b1: u8,
    pub b2: u8,
}

impl CaptionTriplet {
    /// Decodes a 3-byte wire triplet: `header = cc_valid<<2 | cc_type`.
    pub fn from_wire(header: u8, b1: u8, b2: u8) -> Self {
        Self {
            cc_valid: (header & 0x04) != 0,
            cc_type: CcType::from_bits(header),
            b1,
            b2,
        }
    }

    /// Encodes back to the 3-byte wire representation used by RCWT/CDP.
    pub fn to_wire(self) -> [u8; 3] {
        let header = if self.cc_valid { 0x04 } else { 0x00 } | self.cc_type.to_bits();
        [header, self.b1, self.b2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire() {
        let t = CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::DtvccData,
            b1: 0x41,
            b2: 0x42,
        };
        let wire = t.to_wire();
        assert_eq!(CaptionTriplet::from_wire(wire[0], wire[1], wire[2]), t);
    }

    #[test]
    fn invalid_triplet_keeps_type() {
        let t = CaptionTriplet::from_wire(0x01, 0x00, 0x00);
        assert!(!t.cc_valid);
        assert_eq!(t.cc_type, CcType::NtscF2);
    }
}

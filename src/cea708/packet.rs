//! DTVCC packet reassembly: folds `cc_type 2/3` triplets into complete
//! packets, tracking the 2-bit sequence number and declared length.
//!
//! Grounded on `original_source/src/708.c`'s packet buffer handling.

use crate::cctriplet::{CaptionTriplet, CcType};

const MAX_PACKET_LEN: usize = 128;

/// Accumulates `DtvccStart`/`DtvccData` triplets into complete DTVCC
/// packets.
pub struct PacketReassembler {
    buffer: Vec<u8>,
    expected_seq: Option<u8>,
    declared_len: usize,
}

impl Default for PacketReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketReassembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_PACKET_LEN),
            expected_seq: None,
            declared_len: 0,
        }
    }

    /// Feeds one triplet. Returns a completed packet's bytes (header
    /// byte included) when the declared length has been reached.
    pub fn feed(&mut self, triplet: &CaptionTriplet) -> Option<Vec<u8>> {
        if !triplet.cc_valid {
            return None;
        }
        match triplet.cc_type {
            CcType::DtvccStart => {
                self.start_new(triplet.b1);
                self.push_bytes(triplet.b1, triplet.b2)
            }
            CcType::DtvccData => {
                if self.expected_seq.is_none() {
                    // Data arriving with no open packet: drop silently,
                    // matching the original's "reset decoder" recovery.
                    return None;
                }
                self.push_bytes(triplet.b1, triplet.b2)
            }
            _ => None,
        }
    }

    fn start_new(&mut self, header: u8) {
        let sequence_number = (header >> 6) & 0x03;
        if let Some(expected) = self.expected_seq {
            if expected != sequence_number {
                // Gap: reset and start fresh from this packet anyway.
                self.buffer.clear();
            }
        }
        self.buffer.clear();
        let length_field = header & 0x3F;
        self.declared_len = if length_field == 0 { 128 } else { length_field as usize * 2 };
        self.expected_seq = Some((sequence_number + 1) % 4);
    }

    fn push_bytes(&mut self, b1: u8, b2: u8) -> Option<Vec<u8>> {
        self.buffer.push(b1);
        if self.buffer.len() < self.declared_len {
            self.buffer.push(b2);
        }

        if self.buffer.len() >= self.declared_len {
            self.buffer.truncate(self.declared_len);
            let packet = std::mem::take(&mut self.buffer);
            self.expected_seq = None;
            Some(packet)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplet(cc_type: CcType, b1: u8, b2: u8) -> CaptionTriplet {
        CaptionTriplet {
            cc_valid: true,
            cc_type,
            b1,
            b2,
        }
    }

    #[test]
    fn assembles_packet_from_length_field() {
        // length_field = 2 -> declared_len = 4 bytes total.
        let mut r = PacketReassembler::new();
        let header = 0b00_000010u8;
        assert!(r.feed(&triplet(CcType::DtvccStart, header, 0xAA)).is_none());
        let packet = r.feed(&triplet(CcType::DtvccData, 0xBB, 0xCC)).unwrap();
        assert_eq!(packet, vec![header, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn zero_length_field_means_128_bytes() {
        let mut r = PacketReassembler::new();
        let header = 0x00u8; // length_field 0 -> 128
        r.feed(&triplet(CcType::DtvccStart, header, 0x01));
        for _ in 0..62 {
            r.feed(&triplet(CcType::DtvccData, 0x02, 0x03));
        }
        let packet = r.feed(&triplet(CcType::DtvccData, 0x02, 0x03));
        assert!(packet.is_some());
        assert_eq!(packet.unwrap().len(), 128);
    }

    #[test]
    fn data_with_no_open_packet_is_dropped() {
        let mut r = PacketReassembler::new();
        assert!(r.feed(&triplet(CcType::DtvccData, 0x01, 0x02)).is_none());
    }

    #[test]
    fn sequence_gap_discards_partial_bytes_from_the_abandoned_packet() {
        // Sequence 0 declares length_field 2 (4 bytes total) but only
        // gets its header pair fed before a new packet, at sequence 2
        // (skipping the expected 1), starts. None of the abandoned
        // packet's bytes should surface in the one that follows.
        let mut r = PacketReassembler::new();
        let abandoned_header = 0b00_000010u8; // seq 0, length_field 2
        assert!(r
            .feed(&triplet(CcType::DtvccStart, abandoned_header, 0xAA))
            .is_none());

        let next_header = 0b10_000001u8; // seq 2, length_field 1 (2 bytes total)
        let packet = r.feed(&triplet(CcType::DtvccStart, next_header, 0x11)).unwrap();
        assert_eq!(packet, vec![next_header, 0x11]);
        assert!(!packet.contains(&0xAA));
    }
}

//! # CEA-708 DTVCC decoder
//!
//! Reassembles DTVCC packets from `cc_type 2/3` triplets, demultiplexes
//! them into up to 63 independent services, and composites each
//! service's windows onto a double-buffered 75×210 TV grid, flushing the
//! previous grid whenever a window command changes what's visible.
//!
//! Grounded on `original_source/src/708.c` throughout: `dtvcc_process_data`
//! for packet/service demultiplexing, `dtvcc_window_update` for the
//! anchor-driven composite.

pub mod packet;
pub mod service;
pub mod window;

use std::collections::HashMap;

use bitvec::prelude::*;

pub use packet::PacketReassembler;
pub use service::Cea708ServiceDecoder;
pub use window::{Cea708Window, PenAttr, PenColor, PrintDirection, WindowAttrs};

/// TV grid dimensions, CEA-708 §4.3.
pub const TV_ROWS: usize = 75;
pub const TV_COLS: usize = 210;

/// One composited TV screen, ready for the encoder. Holds the full grid
/// rather than pre-trimmed lines so callers can inspect exact row/column
/// placement (the anchor math is part of what's being tested).
#[derive(Debug, Clone)]
pub struct Cea708Screen {
    pub service_number: u8,
    pub start_ms: i64,
    pub end_ms: i64,
    pub grid: Vec<Vec<Option<char>>>,
}

impl Cea708Screen {
    /// Non-empty rows as `(row_index, trimmed_text)`, in row order.
    pub fn non_empty_lines(&self) -> Vec<(usize, String)> {
        self.grid
            .iter()
            .enumerate()
            .filter_map(|(row, cells)| {
                if cells.iter().all(|c| c.is_none()) {
                    return None;
                }
                let text: String = cells.iter().map(|c| c.unwrap_or(' ')).collect();
                Some((row, text.trim_end().to_string()))
            })
            .collect()
    }
}

/// One service's accumulated windows plus the double-buffered TV grid
/// derived from compositing them.
struct ServiceState {
    decoder: Cea708ServiceDecoder,
    active_grid: Option<Vec<Vec<Option<char>>>>,
    active_start_ms: i64,
}

impl ServiceState {
    fn new() -> Self {
        Self {
            decoder: Cea708ServiceDecoder::new(),
            active_grid: None,
            active_start_ms: 0,
        }
    }

    fn composite(&self) -> Vec<Vec<Option<char>>> {
        let mut tv = vec![vec![None; TV_COLS]; TV_ROWS];
        let mut visible: Vec<&Cea708Window> = self
            .decoder
            .windows
            .iter()
            .filter(|w| w.defined && w.visible && !w.is_empty())
            .collect();
        visible.sort_by_key(|w| w.attrs.priority);
        for window in visible {
            let (top, left) = window.anchor_top_left();
            let rows = window.grid.len().min(TV_ROWS.saturating_sub(top));
            for (r, row) in window.grid.iter().take(rows).enumerate() {
                let cols = row.len().min(TV_COLS.saturating_sub(left));
                for (c, cell) in row.iter().take(cols).enumerate() {
                    if cell.is_some() {
                        tv[top + r][left + c] = *cell;
                    }
                }
            }
        }
        tv
    }

    fn grid_is_empty(grid: &[Vec<Option<char>>]) -> bool {
        grid.iter().all(|row| row.iter().all(|c| c.is_none()))
    }
}

/// Top-level CEA-708 decoder: one packet reassembler feeding up to 63
/// lazily allocated per-service decoders.
pub struct Cea708Decoder {
    reassembler: PacketReassembler,
    services: HashMap<u8, ServiceState>,
    /// Which of the 63 services have been seen at least once, used only
    /// for reporting (the original logs "service N active" once).
    seen_services: BitArr!(for 64, in u64),
}

impl Default for Cea708Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Cea708Decoder {
    pub fn new() -> Self {
        Self {
            reassembler: PacketReassembler::new(),
            services: HashMap::new(),
            seen_services: bitarr![u64, Lsb0; 0; 64],
        }
    }

    /// Feeds one caption triplet. Returns any screens that were flushed
    /// as a side effect of a window visibility change in this step's
    /// packet (empty unless this triplet completed a packet).
    pub fn feed(
        &mut self,
        triplet: &crate::cctriplet::CaptionTriplet,
        current_ms: i64,
    ) -> Vec<Cea708Screen> {
        let Some(packet) = self.reassembler.feed(triplet) else {
            return Vec::new();
        };
        self.decode_packet(&packet, current_ms)
    }

    fn decode_packet(&mut self, packet: &[u8], current_ms: i64) -> Vec<Cea708Screen> {
        let mut out = Vec::new();
        let mut i = 1; // packet[0] is the sequence/length header, already consumed.
        while i < packet.len() {
            let header = packet[i];
            i += 1;
            let mut service_number = (header >> 5) & 0x07;
            let block_length = (header & 0x1F) as usize;

            if service_number == 7 {
                if i >= packet.len() {
                    break;
                }
                service_number = packet[i] & 0x3F;
                i += 1;
            }

            if service_number == 0 {
                if block_length != 0 {
                    // Service 0 with nonzero length is illegal; the rest
                    // of the packet is undefined, stop here.
                    break;
                }
                continue;
            }

            if i + block_length > packet.len() {
                break;
            }
            let block = &packet[i..i + block_length];
            i += block_length;

            if (service_number as usize) < 64 {
                self.seen_services.set(service_number as usize, true);
            }
            let state = self
                .services
                .entry(service_number)
                .or_insert_with(ServiceState::new);
            let changed = state.decoder.decode_block(block);
            if !changed {
                continue;
            }

            let new_grid = state.composite();
            if let Some(old) = state.active_grid.take() {
                if !ServiceState::grid_is_empty(&old) {
                    out.push(Cea708Screen {
                        service_number,
                        start_ms: state.active_start_ms,
                        end_ms: current_ms,
                        grid: old,
                    });
                }
            }
            if ServiceState::grid_is_empty(&new_grid) {
                state.active_grid = None;
            } else {
                state.active_grid = Some(new_grid);
                state.active_start_ms = current_ms;
            }
        }
        out
    }

    /// Flushes any service with an active (non-empty) grid, e.g. at EOF.
    pub fn flush(&mut self, current_ms: i64) -> Vec<Cea708Screen> {
        let mut out = Vec::new();
        for (&service_number, state) in self.services.iter_mut() {
            if let Some(grid) = state.active_grid.take() {
                if !ServiceState::grid_is_empty(&grid) {
                    out.push(Cea708Screen {
                        service_number,
                        start_ms: state.active_start_ms,
                        end_ms: current_ms,
                        grid,
                    });
                }
            }
        }
        out
    }

    /// Number of distinct services observed so far, for the run report.
    pub fn services_seen(&self) -> usize {
        self.seen_services.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cctriplet::{CaptionTriplet, CcType};

    fn triplet(cc_type: CcType, b1: u8, b2: u8) -> CaptionTriplet {
        CaptionTriplet {
            cc_valid: true,
            cc_type,
            b1,
            b2,
        }
    }

    /// Builds a DTVCC packet's bytes (header included) from a sequence
    /// number and one service's worth of raw command bytes.
    fn build_packet(seq: u8, service_number: u8, service_bytes: &[u8]) -> Vec<u8> {
        let svc_header = (service_number << 5) | (service_bytes.len() as u8 & 0x1F);
        let mut body = vec![svc_header];
        body.extend_from_slice(service_bytes);
        if body.len() % 2 != 0 {
            body.push(0x00); // 708 packets pad to an even total length.
        }
        let length_field = (body.len() / 2) as u8;
        let mut packet = vec![(seq << 6) | length_field];
        packet.extend_from_slice(&body);
        packet
    }

    fn triplets_from_packet(bytes: &[u8]) -> Vec<CaptionTriplet> {
        let mut chunks = bytes.chunks(2);
        let first = chunks.next().unwrap();
        let mut out = vec![triplet(CcType::DtvccStart, first[0], first[1])];
        for chunk in chunks {
            out.push(triplet(CcType::DtvccData, chunk[0], chunk[1]));
        }
        out
    }

    /// Service 1 defines a window anchored so that pen row 14 lands at
    /// absolute TV row 14, writes "Hello", displays it, then hides it 2s
    /// later.
    #[test]
    fn single_window_service_emits_screen_on_hide() {
        let mut dec = Cea708Decoder::new();

        let mut define_and_write = vec![0x98]; // DF0
        // priority=0, anchor_point=0 (top-left), anchor_vertical=0,
        // anchor_horizontal=0, row_count=15 (so pen row 14 is valid),
        // col_count=32, trailing pen/win style byte unused.
        define_and_write.extend_from_slice(&[0x00, 0x00, 0x00, 0x0E, 0x1F, 0x00]);
        define_and_write.push(0x92); // SPL
        define_and_write.extend_from_slice(&[0x0E, 0x00]); // row 14, col 0
        define_and_write.extend_from_slice(b"Hello");
        define_and_write.push(0x89); // DSW
        define_and_write.push(0x01); // window 0

        let packet = build_packet(0, 1, &define_and_write);
        let mut screens = Vec::new();
        for t in triplets_from_packet(&packet) {
            screens.extend(dec.feed(&t, 0));
        }
        assert!(screens.is_empty(), "DSW turns the window on, nothing to flush yet");

        let hide_packet = build_packet(1, 1, &[0x8A, 0x01]); // HDW window 0
        let mut emitted = Vec::new();
        for t in triplets_from_packet(&hide_packet) {
            emitted.extend(dec.feed(&t, 2000));
        }
        let screen = emitted.into_iter().next().expect("HDW should flush the populated window");
        assert_eq!(screen.start_ms, 0);
        assert_eq!(screen.end_ms, 2000);
        let lines = screen.non_empty_lines();
        assert_eq!(lines, vec![(14, "Hello".to_string())]);
    }

    #[test]
    fn service_zero_nonzero_length_terminates_packet() {
        let mut dec = Cea708Decoder::new();
        // sequence 0, length_field irrelevant to this unit test beyond
        // being big enough to hold our bytes.
        let bytes = vec![0x02, 0x01, 0xFF]; // service=0, length=1 (illegal)
        let t1 = triplet(CcType::DtvccStart, bytes[0], bytes[1]);
        let t2 = triplet(CcType::DtvccData, bytes[2], 0x00);
        dec.feed(&t1, 0);
        let out = dec.feed(&t2, 0);
        assert!(out.is_empty());
    }
}

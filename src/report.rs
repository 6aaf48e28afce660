//! # Run Report
//!
//! Grounded on `original_source/src/params_dump.c` and the `file_report`
//! global: a per-run mutable output the pipeline accumulates as it
//! processes input and returns to the caller at EOF, the companion to the
//! construction-time-immutable `Config`.

use crate::demux::StreamKind;
use std::collections::HashMap;

/// Counters and detected facts accumulated over one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Autodetected container kind, once known.
    pub detected_stream_kind: Option<StreamKind>,
    /// Number of CEA-608 caption blocks seen on field 1.
    pub cc_blocks_field1: u64,
    /// Number of CEA-608 caption blocks seen on field 2.
    pub cc_blocks_field2: u64,
    /// Number of CEA-708 DTVCC packets reassembled.
    pub cc_blocks_708: u64,
    /// Number of CEA-708 packets dropped due to a sequence-number gap.
    pub cc_708_sequence_errors: u64,
    /// Number of XDS packets that passed their checksum.
    pub xds_packets_ok: u64,
    /// Number of XDS packets dropped for a checksum failure.
    pub xds_checksum_errors: u64,
    /// Number of subtitle screens emitted per output channel (field 1,
    /// field 2, 708 service number).
    pub screens_emitted: HashMap<String, u64>,
    /// Number of "big PTS change" events observed.
    pub clock_jumps: u64,
    /// Number of clock jumps that were rebased (vs. refused).
    pub clock_jumps_accepted: u64,
    /// Total duration of the stream as last measured, in milliseconds.
    pub duration_ms: i64,
    /// Number of continuity-counter discontinuities logged (non-fatal).
    pub continuity_errors: u64,
    /// Number of malformed container frames that were skipped.
    pub structural_errors_skipped: u64,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that one screen was emitted on the given output channel.
    pub fn record_screen(&mut self, channel: &str) {
        *self.screens_emitted.entry(channel.to_string()).or_insert(0) += 1;
    }

    /// Total number of screens emitted across all channels.
    pub fn total_screens(&self) -> u64 {
        self.screens_emitted.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_screens_per_channel() {
        let mut report = Report::new();
        report.record_screen("CC1");
        report.record_screen("CC1");
        report.record_screen("CC2");
        assert_eq!(report.screens_emitted["CC1"], 2);
        assert_eq!(report.screens_emitted["CC2"], 1);
        assert_eq!(report.total_screens(), 3);
    }
}

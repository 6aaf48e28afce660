//! Temporal reorder buffer: MPEG-2/H.264 user data arrives in decode
//! order but captions must be emitted in display order, so each batch is
//! parked at a slot keyed by its distance from the last anchor frame and
//! flushed once that distance is surpassed by a later arrival.
//!
//! Grounded on `original_source/src/stream.c`'s `MAXBFRAMES`-sized
//! reorder window (`2*MAXBFRAMES + 1` slots).

use super::ScannedUserData;

const MAXBFRAMES: usize = 50;
const BUFFER_SIZE: usize = 2 * MAXBFRAMES + 1;

/// Holds up to `BUFFER_SIZE` pending batches, indexed by their offset
/// from the current anchor's temporal reference, and releases them once
/// all earlier display positions have been filled or a gap forces an
/// early flush.
pub struct ReorderBuffer {
    slots: Vec<Option<ScannedUserData>>,
    anchor_tref: u16,
    has_anchor: bool,
}

impl Default for ReorderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self {
            slots: (0..BUFFER_SIZE).map(|_| None).collect(),
            anchor_tref: 0,
            has_anchor: false,
        }
    }

    /// Inserts a scanned batch. Returns any batches that can now be
    /// emitted in display order: normally just this one slot, but an
    /// anchor frame flushes every pending slot before it (and warns, via
    /// the returned `Vec`'s length exceeding 1, of an early flush if the
    /// gap outran the buffer).
    pub fn push(&mut self, data: ScannedUserData) -> Vec<ScannedUserData> {
        if data.is_anchor {
            return self.push_anchor(data);
        }

        if !self.has_anchor {
            // No anchor seen yet: nothing to reorder against, pass through.
            return vec![data];
        }

        let offset = self.display_offset(data.temporal_reference);
        if offset >= BUFFER_SIZE {
            // Gap exceeds the buffer: flush everything held so far, then
            // emit this one directly rather than losing it.
            let mut out = self.drain();
            out.push(data);
            return out;
        }
        self.slots[offset] = Some(data);
        Vec::new()
    }

    fn display_offset(&self, temporal_reference: u16) -> usize {
        let delta = temporal_reference as i32 - self.anchor_tref as i32;
        (delta + MAXBFRAMES as i32).max(0) as usize
    }

    fn push_anchor(&mut self, data: ScannedUserData) -> Vec<ScannedUserData> {
        let mut out = self.drain();
        self.anchor_tref = data.temporal_reference;
        self.has_anchor = true;
        out.push(data);
        out
    }

    /// Flushes every pending slot in display order, leaving the buffer
    /// empty. Called on anchor frames and on stream end.
    pub fn drain(&mut self) -> Vec<ScannedUserData> {
        let out = self.slots.drain(..).flatten().collect();
        self.slots.resize_with(BUFFER_SIZE, || None);
        out
    }
}

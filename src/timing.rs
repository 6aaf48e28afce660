//! # Timing engine
//!
//! Converts 33-bit PES PTS, GOP time codes, or container-native
//! timestamps into a monotonic millisecond frame-time stream (`fts`),
//! compensating for 33-bit PTS rollover and rejecting spurious
//! reference-clock jumps.
//!
//! Grounded on `original_source/src/stream.c`'s `set_fts`/`get_fts` pair
//! and the frame-rate rational table in `original_source/src/ccx_common_timing.c`.
//! All arithmetic here is exact integer rationals; floating point is never
//! used for frame-time math.

use crate::error::{CcxError, Result};

const PTS_ROLLOVER_BITS: u32 = 33;
const PTS_MAX: i64 = 1i64 << PTS_ROLLOVER_BITS;
const MPEG_CLOCK_HZ: i64 = 90_000;

/// A `(numerator, denominator)` frames-per-second rational, indexed by
/// the MPEG-2 sequence-header frame-rate code (Table 6-4, codes 1..=8;
/// codes 9..=15 reserved/unused map to `0/0` and are rejected).
pub const FRAME_RATE_TABLE: [(u32, u32); 16] = [
    (0, 0),
    (24_000, 1_001),
    (24, 1),
    (25, 1),
    (30_000, 1_001),
    (30, 1),
    (50, 1),
    (60_000, 1_001),
    (60, 1),
    (0, 0),
    (0, 0),
    (0, 0),
    (0, 0),
    (0, 0),
    (0, 0),
    (0, 0),
];

/// Looks up a frame-rate code from an MPEG-2 sequence header, falling
/// back to NTSC `30000/1001` for reserved codes rather than failing the
/// whole stream over one bad sequence header.
pub fn frame_rate_for_code(code: u8) -> (u32, u32) {
    match FRAME_RATE_TABLE.get(code as usize) {
        Some(&(0, 0)) | None => (30_000, 1_001),
        Some(&rate) => rate,
    }
}

/// A "big PTS change" classification: how far `current_pts` drifted from
/// `sync_pts`, and whether the pipeline should rebase or refuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockJumpKind {
    /// No discontinuity; business as usual.
    None,
    /// Discontinuity accepted because it landed on an I-frame or
    /// `tref == 0`; `fts_offset` is rebased to keep the timeline
    /// monotonic.
    Rebased,
    /// Discontinuity refused because it landed mid-GOP on a non-anchor
    /// frame; `fts_now` is left unchanged and the caller should log
    /// [`CcxError::ClockJump`].
    Refused,
}

/// Converts PTS/GOP/tref inputs into a monotonic `fts` stream.
///
/// Mirrors the five fields the original timing engine threads through
/// every frame: `min_pts`, `sync_pts`, `current_pts` (all 90 kHz MPEG
/// clock units), and `fts_offset`/`fts_global`/`fts_max`/`fts_now` (all
/// milliseconds).
#[derive(Debug, Clone, Copy)]
pub struct TimingContext {
    min_pts: i64,
    sync_pts: i64,
    current_pts: i64,
    rollover_bits: i64,
    fts_offset: i64,
    fts_global: i64,
    fts_max: i64,
    fts_now: i64,
    initialized: bool,
    last_pts_high_bits: u8,
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingContext {
    pub fn new() -> Self {
        Self {
            min_pts: 0,
            sync_pts: 0,
            current_pts: 0,
            rollover_bits: 0,
            fts_offset: 0,
            fts_global: 0,
            fts_max: 0,
            fts_now: 0,
            initialized: false,
            last_pts_high_bits: 0,
        }
    }

    /// Folds a freshly observed raw (pre-rollover-correction) PTS value
    /// into `current_pts`, detecting the high-bit-group wrap described in
    /// the design notes: a `0b111 -> 0b000` transition in the top 3 bits
    /// increments `rollover_bits`, and the reverse (late B-frames
    /// arriving after the wrap anchor) decrements it.
    pub fn observe_raw_pts(&mut self, raw_pts: i64) -> i64 {
        let high_bits = ((raw_pts >> 30) & 0b111) as u8;
        if self.last_pts_high_bits == 0b111 && high_bits == 0b000 {
            self.rollover_bits += 1;
        } else if self.last_pts_high_bits == 0b000 && high_bits == 0b111 {
            self.rollover_bits -= 1;
        }
        self.last_pts_high_bits = high_bits;
        raw_pts + self.rollover_bits * PTS_MAX
    }

    /// Runs one frame through the timing engine. `current_pts` must
    /// already be rollover-corrected (see [`Self::observe_raw_pts`]).
    /// `fps` is the exact `(num, den)` rational for the active frame
    /// rate. Returns the jump classification so the caller can decide
    /// whether to log [`CcxError::ClockJump`].
    pub fn set_fts(
        &mut self,
        current_pts: i64,
        current_tref: u32,
        fps: (u32, u32),
        is_anchor: bool,
    ) -> Result<ClockJumpKind> {
        if fps.1 == 0 {
            return Err(CcxError::Structural("zero-denominator frame rate".into()));
        }
        self.current_pts = current_pts;

        if !self.initialized {
            self.min_pts = current_pts;
            // sync_pts = current_pts - current_tref * 90_000 / fps, done as
            // an exact rational: tref * 90_000 * den / num.
            let tref_ticks = (current_tref as i64) * MPEG_CLOCK_HZ * fps.1 as i64 / fps.0 as i64;
            self.sync_pts = current_pts - tref_ticks;
            self.fts_offset = 0;
            self.initialized = true;
            self.fts_now = 0;
            self.fts_max = 0;
            return Ok(ClockJumpKind::None);
        }

        let delta_ms = (current_pts - self.sync_pts) / (MPEG_CLOCK_HZ / 1000);
        let jump = if delta_ms > 5000 || delta_ms < -200 {
            if is_anchor || current_tref == 0 {
                self.sync_pts = current_pts;
                self.fts_offset = self.fts_max;
                ClockJumpKind::Rebased
            } else {
                return Ok(ClockJumpKind::Refused);
            }
        } else {
            ClockJumpKind::None
        };

        self.fts_now = (current_pts - self.min_pts) / (MPEG_CLOCK_HZ / 1000) + self.fts_offset;
        self.fts_max = self.fts_max.max(self.fts_now);
        Ok(jump)
    }

    /// Returns the presentation time, in milliseconds, of a caption
    /// block carried by the current frame. `field_index` selects among
    /// the (up to two) NTSC caption fields or the single 708 packet per
    /// frame; `fps` is the active rational used to space multiple
    /// caption blocks within one frame.
    pub fn get_fts(&self, field_index: u32, fps: (u32, u32)) -> i64 {
        if fps.0 == 0 {
            return self.fts_now + self.fts_global;
        }
        let field_offset_ms = (field_index as i64) * 1000 * fps.1 as i64 / fps.0 as i64;
        self.fts_now + self.fts_global + field_offset_ms
    }

    /// Rebases the global offset when a program/stream-type change
    /// flushes the current timeline (a PAT change, a stream-type change,
    /// or a big PTS change on an I-frame all trigger this upstream).
    pub fn advance_fts_global(&mut self, by_ms: i64) {
        self.fts_global += by_ms;
    }

    pub fn fts_max(&self) -> i64 {
        self.fts_max
    }

    pub fn rollover_bits(&self) -> i64 {
        self.rollover_bits
    }
}

/// Derives a 90 kHz PTS from a GOP time code and latched frame rate, for
/// use as a fallback timeline when PES PTS is absent or unreliable.
pub fn pts_from_gop_timecode(
    hours: u8,
    minutes: u8,
    seconds: u8,
    pictures: u8,
    fps: (u32, u32),
) -> i64 {
    if fps.0 == 0 {
        return 0;
    }
    let total_seconds = hours as i64 * 3600 + minutes as i64 * 60 + seconds as i64;
    let total_pictures = total_seconds * fps.0 as i64 / fps.1 as i64 + pictures as i64;
    total_pictures * MPEG_CLOCK_HZ * fps.1 as i64 / fps.0 as i64
}

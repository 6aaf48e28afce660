//! # Video user-data scanner
//!
//! Watches MPEG-2 and H.264/AVC elementary-stream bytes for embedded
//! closed-caption user data and reorders it into presentation order,
//! grounded on `original_source/src/file_functions.c` §"user data"
//! dispatch and `bkataru-workshop-vdkio::codec::h264::parser` for the
//! NAL-unit/Exp-Golomb parsing shape (generalized from codec-config
//! extraction to caption SEI extraction).

/// MPEG-2 sequence/GOP/picture/user-data marker scanning.
pub mod mpeg2;

/// H.264/AVC NAL unit parsing and SEI user-data extraction.
pub mod h264;

/// Temporal reorder buffer for caption triplets emitted in decode order.
pub mod reorder;

pub use reorder::ReorderBuffer;

use crate::cctriplet::CaptionTriplet;

/// One batch of caption triplets recovered from a single access unit's
/// user data, tagged with the temporal reference needed to reorder it
/// into display order.
#[derive(Debug, Clone)]
pub struct ScannedUserData {
    /// Temporal reference / picture order count of the access unit this
    /// user data was carried in.
    pub temporal_reference: u16,
    /// True when this access unit is an anchor (I/P frame, or IDR for
    /// H.264) that can start a new reorder epoch.
    pub is_anchor: bool,
    /// Triplets recovered from the user data, in carrier order (DVD/
    /// SCTE-20/GA94/Dish/Divicom all normalise to this).
    pub triplets: Vec<CaptionTriplet>,
    /// Presentation time, in milliseconds, computed by the timing engine
    /// when this access unit arrived (decode order). Reordering changes
    /// emission order but never recomputes this value, since it already
    /// reflects the frame's own PTS.
    pub fts_ms: i64,
}

//! # Demultiplexer
//!
//! Discovers programs/streams in whatever container the input turns out
//! to be (MPEG-TS, MPEG-PS, MP4, GXF, MXF, the crate's own RCWT, or a raw
//! elementary stream) and delivers PES-like payloads tagged with a
//! presentation timestamp, matching the data model's `PatEntry`/
//! `PmtEntry` pair and the per-container walks described in the
//! component-design section.
//!
//! Grounded on `bkataru-workshop-vdkio::format::ts` for the general shape
//! (a packet parser plus a demuxer that owns per-PID assembly state) and
//! on `original_source/src/lib_ccx/ccx_demuxer.c`,
//! `src/lib_ccx/ccx_gxf.c`, `src/lib_ccx/ccx_demuxer_mxf.c`, and
//! `src/ts_functions.c` for container-specific semantics.

/// Shared container-agnostic types: stream kinds, PAT/PMT entries, PES
/// payloads.
pub mod types;

/// Container autodetection (first ≤1 MiB sniff).
pub mod detect;

/// MPEG Transport Stream demultiplexing (PAT/PMT walk, PES reassembly).
pub mod ts;

/// MPEG Program Stream demultiplexing.
pub mod ps;

/// MP4/ISOBMFF box walk and sample extraction.
pub mod mp4;

/// GXF (General eXchange Format) packet walk and CDP extraction.
pub mod gxf;

/// MXF (Material eXchange Format) KLV walk and CDP extraction.
pub mod mxf;

/// The crate's own "raw captions with timing" interchange format.
pub mod rcwt;

/// SMPTE-334 Caption Distribution Packet parsing shared by GXF and MXF.
pub mod cdp;

pub use detect::{detect_stream_type, StreamKind};
pub use types::{
    Descriptor, ElementaryStreamInfo, PatEntry, PesPayload, PmtEntry, StreamType,
};

use crate::error::Result;

/// Common contract every container demultiplexer implements: pull the
/// next PES-like payload out of the container, tagged with its elementary
/// stream id and presentation timestamp (in 90 kHz units) when known.
pub trait Demuxer {
    /// Reads the next payload belonging to a selected elementary stream.
    /// Returns `Err(CcxError::Eof)` when the underlying byte source is
    /// exhausted and no more payloads can be assembled.
    fn next_payload(&mut self) -> Result<PesPayload>;
}

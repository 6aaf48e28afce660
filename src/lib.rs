#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # ccx-core
//!
//! `ccx-core` recovers closed captions and subtitles from digital video
//! containers. It demultiplexes MPEG-TS, MPEG-PS, MP4, GXF, MXF, or its
//! own RCWT interchange format, scans MPEG-2/H.264 video elementary
//! streams for embedded caption user data, decodes CEA-608 and CEA-708
//! caption streams with a faithful state machine, and re-emits the
//! recovered screens as SRT, SAMI, SMPTE-TT, transcript, spupng, or RCWT.
//!
//! Command-line parsing, network receive, bitmap-subtitle OCR, PNG
//! encoding, and the teletext decoder are external collaborators; this
//! crate only defines the interfaces they plug into ([`notify::Notifier`],
//! [`bytesrc::ByteSource`]).
//!
//! ## Module overview
//!
//! - [`bytesrc`]: buffered byte source abstraction over files/concatenated
//!   inputs.
//! - [`demux`]: container demultiplexing (TS, PS, MP4, GXF, MXF, RCWT).
//! - [`scanner`]: MPEG-2/H.264 video user-data scanning and temporal
//!   reordering.
//! - [`timing`]: PTS/GOP-timecode to monotonic frame-time conversion.
//! - [`cea608`]: the CEA-608 line-21 decoder.
//! - [`cea708`]: the CEA-708 DTVCC decoder.
//! - [`encoder`]: subtitle output formats.
//! - [`pipeline`]: the top-level orchestrator wiring everything above.
//! - [`config`]: construction-time-immutable pipeline configuration.
//! - [`report`]: per-run mutable counters returned to the caller.
//! - [`notify`]: activity/progress notification interface.
//! - [`error`]: error kinds and the crate's `Result` alias.

/// Error kinds and the crate's `Result` alias.
pub mod error;

/// Bit-level reader with Exp-Golomb support, used by the H.264 scanner.
pub mod bits;

/// MPEG-2 CRC32, used to validate PAT/PMT sections.
pub mod crc;

/// The caption triplet shared by every demuxer backend and both decoders.
pub mod cctriplet;

/// Buffered byte source abstraction.
pub mod bytesrc;

/// Container demultiplexing.
pub mod demux;

/// MPEG-2/H.264 video user-data scanning and temporal reordering.
pub mod scanner;

/// PTS/GOP-timecode to monotonic frame-time conversion.
pub mod timing;

/// CEA-608 line-21 decoder.
pub mod cea608;

/// CEA-708 DTVCC decoder.
pub mod cea708;

/// Subtitle output encoders.
pub mod encoder;

/// Construction-time-immutable pipeline configuration.
pub mod config;

/// Per-run mutable report.
pub mod report;

/// Activity/progress notification interface.
pub mod notify;

/// Top-level pipeline orchestrator.
pub mod pipeline;

pub use error::{CcxError, Result};

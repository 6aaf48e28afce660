//! # Error Types
//!
//! Central error type for the caption pipeline, modeled after the six error
//! kinds in the design's error-handling section: `Structural`, `Stream`,
//! `ClockJump`, `Resource`, `Io`, `Configuration`. Frame-level parsing
//! returns `Result<T>` everywhere; the pipeline loop is the only place that
//! decides whether a given error is recovered locally or surfaced to the
//! caller (see `pipeline::Pipeline::run`).
//!
//! ## Example
//!
//! ```rust
//! use ccx_core::error::{CcxError, Result};
//!
//! fn parse_pat(data: &[u8]) -> Result<()> {
//!     if data.is_empty() {
//!         return Err(CcxError::Structural("empty PAT section".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Primary error type for the ccx-core library.
#[derive(Error, Debug)]
pub enum CcxError {
    /// Malformed container frame: bad sync byte, wrong marker, impossible
    /// length. Recovered by skipping the frame and continuing.
    #[error("structural error: {0}")]
    Structural(String),

    /// Violation of a stream-internal invariant: 608 parity failure, 708
    /// sequence-number gap, XDS checksum failure. Recovered locally (drop
    /// pair, reset decoder, drop packet).
    #[error("stream error: {0}")]
    Stream(String),

    /// PTS discontinuity beyond the accepted window. Carries whether the
    /// jump occurred on an I-frame / `tref == 0`, which determines whether
    /// the pipeline rebases or refuses it.
    #[error("clock jump: {delta_ms} ms (on_iframe_or_tref0={on_iframe_or_tref0})")]
    ClockJump {
        /// Observed delta versus `sync_pts`, in milliseconds (signed).
        delta_ms: i64,
        /// Whether this occurred on an I-frame or `tref == 0`.
        on_iframe_or_tref0: bool,
    },

    /// Allocation failure. Always fatal.
    #[error("not enough memory: {0}")]
    Resource(String),

    /// Unrecoverable byte-source failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Contradictory configuration options, detected at start-up.
    #[error("incompatible parameters: {0}")]
    Configuration(String),

    /// Byte source reached end of file.
    #[error("end of file")]
    Eof,

    /// Byte source reached a live-timeout with no data yet; the caller may
    /// retry rather than treat this as a real EOF.
    #[error("transient end of file (live timeout)")]
    TransientEof,
}

impl CcxError {
    /// Whether this error is local/recoverable: per the design's policy,
    /// only `Resource`, `Io`, and `Configuration` surface as a process
    /// exit; everything else is logged and the pipeline continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CcxError::Structural(_) | CcxError::Stream(_) | CcxError::ClockJump { .. }
        )
    }
}

/// A specialized Result type for ccx-core operations.
pub type Result<T> = std::result::Result<T, CcxError>;

/// Process exit codes, as enumerated in the external interfaces section.
/// These are produced at the process boundary (the external CLI
/// collaborator), not returned from library calls, but are kept here so
/// that collaborator has a single source of truth to map `CcxError` onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful run.
    Ok = 0,
    /// No input files were given.
    NoInputFiles = 2,
    /// Too many input files for the selected mode.
    TooManyInputFiles = 3,
    /// Two or more configuration options contradict each other.
    IncompatibleParameters = 4,
    /// Output file could not be created.
    FileCreationFailed = 5,
    /// Input file size could not be determined.
    UnableToDetermineFileSize = 6,
    /// A configuration value failed validation.
    MalformedParameter = 7,
    /// Unrecoverable read error from the byte source.
    ReadError = 8,
    /// Recognized but unsupported container/codec combination.
    Unsupported = 9,
    /// Catch-all for an error that doesn't fit another bucket.
    NotClassified = 300,
    /// Allocation failure.
    NotEnoughMemory = 500,
    /// The on-disk capitalization word list was malformed.
    ErrorInCapitalizationFile = 501,
    /// An internal fixed-size buffer filled up unexpectedly.
    BufferFull = 502,
    /// An internal invariant was violated; should never happen.
    BugBug = 1000,
    /// ASF input was selected but the ASF header could not be found.
    MissingAsfHeader = 1001,
    /// RCWT input was selected but the RCWT header could not be found.
    MissingRcwtHeader = 1002,
}

impl From<&CcxError> for ExitCode {
    fn from(err: &CcxError) -> Self {
        match err {
            CcxError::Resource(_) => ExitCode::NotEnoughMemory,
            CcxError::Io(_) => ExitCode::ReadError,
            CcxError::Configuration(_) => ExitCode::IncompatibleParameters,
            CcxError::Eof | CcxError::TransientEof => ExitCode::Ok,
            CcxError::Structural(_) | CcxError::Stream(_) | CcxError::ClockJump { .. } => {
                ExitCode::NotClassified
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_stay_local() {
        assert!(CcxError::Structural("x".into()).is_recoverable());
        assert!(CcxError::Stream("x".into()).is_recoverable());
        assert!(CcxError::ClockJump {
            delta_ms: 6000,
            on_iframe_or_tref0: false
        }
        .is_recoverable());
    }

    #[test]
    fn fatal_kinds_are_not_recoverable() {
        assert!(!CcxError::Resource("oom".into()).is_recoverable());
        assert!(!CcxError::Configuration("bad".into()).is_recoverable());
    }

    #[test]
    fn exit_code_mapping() {
        assert_eq!(
            ExitCode::from(&CcxError::Resource("x".into())),
            ExitCode::NotEnoughMemory
        );
        assert_eq!(
            ExitCode::from(&CcxError::Configuration("x".into())),
            ExitCode::IncompatibleParameters
        );
    }
}

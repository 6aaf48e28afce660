//! # Configuration
//!
//! The pipeline's configuration is a plain, construction-time-immutable
//! struct: nothing in this crate reads environment variables or files.
//! An external CLI/config-file collaborator is expected to build a
//! `Config` value (optionally via `serde` deserialization) and hand it to
//! `Pipeline::new`.
//!
//! Every enumerated option in the external-interfaces section of the
//! design has a field here.

use serde::{Deserialize, Serialize};

/// Which field(s) to extract captions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extract {
    /// Field 1 only.
    Field1,
    /// Field 2 only.
    Field2,
    /// Both fields.
    Both,
}

/// CEA-608 channel selector (channel 3 on field 2 is reserved for XDS).
pub type CcChannel = u8;

/// Teletext handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeletextMode {
    /// Never attempt teletext extraction.
    Forbidden,
    /// Use teletext automatically only if no other caption source is found.
    AutoNotFound,
    /// Teletext decoding is in use.
    InUse,
}

/// Selected subtitle output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteFormat {
    /// SubRip (.srt).
    Srt,
    /// Synchronized Accessible Media Interchange.
    Sami,
    /// SMPTE Timed Text (TTML).
    SmpteTt,
    /// Plain pipe-separated transcript.
    Transcript,
    /// The crate's own raw-captions-with-timing interchange format.
    Rcwt,
    /// Raw CC byte triplets, no timing.
    Raw,
    /// DVD-style raw CC bytes.
    DvdRaw,
    /// Per-frame PNG + XML ("spupng").
    SpuPng,
    /// Discard all output (used for throughput testing).
    Null,
}

/// Output text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8, with a leading BOM.
    #[default]
    Utf8,
    /// UTF-16 little-endian, with a leading BOM.
    Utf16Le,
    /// ISO-8859-1, no BOM.
    Latin1,
}

/// Date/time stamp rendering for output lines that carry a date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    /// No date/time field.
    None,
    /// `HH:MM:SS`.
    HhMmSs,
    /// `HH:MM:SS.mmm` (or with `millis_separator`).
    HhMmSsMs,
    /// Seconds since start, as a plain number.
    Seconds,
    /// Full wall-clock date.
    Date,
}

/// Input container / source auto-detection override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    /// Read from one or more files.
    File,
    /// Read from standard input.
    Stdin,
    /// Read from a UDP multicast socket (external collaborator).
    Udp,
    /// Read from a TCP socket (external collaborator).
    Tcp,
}

/// `use_gop_as_pts` tri-state: prefer container PTS, force GOP time code,
/// or auto-decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GopPtsMode {
    /// Never use GOP time code as the timeline source.
    Never,
    /// Decide automatically based on stream health.
    Auto,
    /// Always use GOP time code as the timeline source.
    Always,
}

/// A wall-clock/duration window used by the start/end credits feature:
/// display the credit text no earlier than `not_before`, no later than
/// `not_after`, for at least `for_at_least` and at most `for_at_most`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsWindow {
    /// Earliest time (ms from start of stream, or ms before end for end
    /// credits) the credit may start.
    pub not_before_ms: Option<i64>,
    /// Latest time the credit may start.
    pub not_after_ms: Option<i64>,
    /// Minimum on-screen duration in ms.
    pub for_at_least_ms: Option<i64>,
    /// Maximum on-screen duration in ms.
    pub for_at_most_ms: Option<i64>,
}

/// Start/end credits configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditsConfig {
    /// Text to show before the first caption, if any.
    pub start_credits_text: Option<String>,
    /// Text to show after the last caption, if any.
    pub end_credits_text: Option<String>,
    /// Timing window for the start credit.
    pub start_window: CreditsWindow,
    /// Timing window for the end credit.
    pub end_window: CreditsWindow,
}

/// Bitmask of debug categories, matching the design's `debug_mask`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugMask(pub u32);

impl DebugMask {
    /// Generic/uncategorized diagnostics.
    pub const GENERIC: u32 = 1 << 0;
    /// Container parsing diagnostics.
    pub const PARSE: u32 = 1 << 1;
    /// PAT table diagnostics.
    pub const PAT: u32 = 1 << 2;
    /// PMT table diagnostics.
    pub const PMT: u32 = 1 << 3;
    /// CEA-608 decoder diagnostics.
    pub const CEA608: u32 = 1 << 4;
    /// CEA-708 decoder diagnostics.
    pub const CEA708: u32 = 1 << 5;
    /// Verbose / everything.
    pub const VERBOSE: u32 = 1 << 6;
    /// XDS decoder diagnostics.
    pub const XDS: u32 = 1 << 7;
    /// Raw caption-block dumps.
    pub const CAPTION_BLOCK_RAW: u32 = 1 << 8;
    /// Video elementary-stream scanning diagnostics.
    pub const VIDEO_ES: u32 = 1 << 9;
    /// Timing-engine diagnostics.
    pub const TIME: u32 = 1 << 10;

    /// Whether `category` is enabled in this mask.
    pub fn has(&self, category: u32) -> bool {
        (self.0 & category) != 0
    }
}

/// Complete pipeline configuration.
///
/// Every field has a specification-compliant default via `Default`; the
/// out-of-scope CLI collaborator is expected to override fields as the
/// user requests, then pass the result to `Pipeline::new` unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Fields & channels
    /// Which field(s) to decode.
    pub extract: Extract,
    /// Selected CEA-608 channel (1..=4).
    pub cc_channel: CcChannel,
    /// Teletext handling mode.
    pub teletext_mode: TeletextMode,
    /// Force a specific captioning PID, bypassing PMT-based selection.
    pub ts_cappid: Option<u16>,
    /// Same as `ts_cappid` but takes priority even over an explicit
    /// teletext request.
    pub ts_forced_cappid: Option<u16>,
    /// Auto-select the program carrying captions (vs. requiring
    /// `ts_forced_program`).
    pub ts_autoprogram: bool,
    /// Force a specific program number.
    pub ts_forced_program: Option<u16>,
    /// Preferred elementary stream type for caption carriage.
    pub ts_datastreamtype: Option<u8>,
    /// Force a specific elementary stream type, skipping auto-detection.
    pub ts_forced_streamtype: Option<u8>,
    /// Hauppauge-card capture quirks mode.
    pub hauppauge_mode: bool,
    /// Which MP4 video track to use when a file has more than one.
    pub mp4vidtrack: Option<u32>,
    /// Use H.264 picture-order-count for temporal reordering instead of
    /// the MPEG-2 temporal_reference field.
    pub usepicorder: bool,

    // Output
    /// Selected output subtitle format.
    pub write_format: WriteFormat,
    /// Output text encoding.
    pub encoding: Encoding,
    /// Date/time field rendering.
    pub date_format: DateFormat,
    /// Millisecond separator character (`,` or `.`) for SRT-like formats.
    pub millis_separator: char,
    /// Use bare `\n` line endings instead of `\r\n`.
    pub line_terminator_lf: bool,
    /// Emit machine-readable progress reports for a GUI collaborator.
    pub gui_mode_reports: bool,
    /// Suppress textual progress bar output.
    pub no_progress_bar: bool,
    /// Omit `<font color=...>` spans from SRT/SAMI output.
    pub nofontcolor: bool,
    /// Omit `<i>`/`<u>` typesetting spans from output.
    pub notypesetting: bool,
    /// Prefix dialogue-change lines with `- ` in SRT output.
    pub autodash: bool,
    /// Trim leading/trailing blank rows from emitted screens.
    pub trim_subs: bool,
    /// Apply sentence-case post-processing to output text.
    pub sentence_cap: bool,
    /// Path to an optional capitalization correction word list.
    pub sentence_cap_file: Option<String>,
    /// Output file path; `None` means write to stdout.
    pub output_filename: Option<String>,

    // Forced decoding
    /// Force all roll-up captions down to a simpler model (0 = no
    /// forcing; 1..=3 forces to `RollUp2`/`RollUp3`/"fake RollUp1").
    pub forced_ru: u8,
    /// Disable roll-up handling entirely (render as pop-on instead).
    pub norollup: bool,
    /// Apply roll-up line shifts directly rather than incrementally.
    pub direct_rollup: bool,
    /// Treat the whole input as one binary blob in concat mode.
    pub fullbin: bool,
    /// Fix padding/parity-stripped NUL runs in 608 byte pairs.
    pub fix_padding: bool,
    /// Disable PTS-based timeline sync; use stream order only.
    pub nosync: bool,
    /// Whether to prefer GOP time code over PTS for the timeline.
    pub use_gop_as_pts: GopPtsMode,
    /// Default foreground color for CEA-608 text lacking an explicit PAC
    /// color.
    pub cc608_default_color: (u8, u8, u8),

    // Credits
    /// Start/end credit text and timing windows.
    pub credits: CreditsConfig,

    // Extraction window
    /// Start extracting only from this point (ms), if set.
    pub extraction_start_ms: Option<i64>,
    /// Stop extracting after this point (ms), if set.
    pub extraction_end_ms: Option<i64>,
    /// Stop after this many emitted screens, if set.
    pub screens_to_process: Option<u32>,

    // Source selection
    /// Requested input source kind.
    pub input_source: InputSource,
    /// UDP multicast address, when `input_source == Udp`.
    pub udpaddr: Option<String>,
    /// UDP port, when `input_source == Udp`.
    pub udpport: Option<u16>,
    /// TCP port, when `input_source == Tcp`.
    pub tcpport: Option<u16>,
    /// TCP password, when `input_source == Tcp`.
    pub tcp_password: Option<String>,
    /// Buffer the whole input before processing (vs. streaming).
    pub buffer_input: bool,
    /// Treat multiple input files as one logical concatenated stream.
    pub binary_concat: bool,
    /// Live-stream read timeout in seconds; `-1` = infinite, `0` =
    /// not live.
    pub live_stream: i32,

    // Teletext
    /// User-selected teletext page, in BCD after normalisation.
    pub tlt_page: Option<u16>,

    // Timing adjustment
    /// Milliseconds to delay (positive) or advance (negative) every
    /// emitted subtitle's timing. Applied at encode time; a screen whose
    /// adjusted `start_ms` would be negative is dropped rather than
    /// clamped.
    pub subs_delay_ms: i64,

    // Debug
    /// Bitmask of enabled debug categories.
    pub debug_mask: DebugMask,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract: Extract::Field1,
            cc_channel: 1,
            teletext_mode: TeletextMode::AutoNotFound,
            ts_cappid: None,
            ts_forced_cappid: None,
            ts_autoprogram: true,
            ts_forced_program: None,
            ts_datastreamtype: None,
            ts_forced_streamtype: None,
            hauppauge_mode: false,
            mp4vidtrack: None,
            usepicorder: false,

            write_format: WriteFormat::Srt,
            encoding: Encoding::Utf8,
            date_format: DateFormat::None,
            millis_separator: ',',
            line_terminator_lf: false,
            gui_mode_reports: false,
            no_progress_bar: false,
            nofontcolor: false,
            notypesetting: false,
            autodash: false,
            trim_subs: false,
            sentence_cap: false,
            sentence_cap_file: None,
            output_filename: None,

            forced_ru: 0,
            norollup: false,
            direct_rollup: false,
            fullbin: false,
            fix_padding: false,
            nosync: false,
            use_gop_as_pts: GopPtsMode::Auto,
            cc608_default_color: (255, 255, 255),

            credits: CreditsConfig::default(),

            extraction_start_ms: None,
            extraction_end_ms: None,
            screens_to_process: None,

            input_source: InputSource::File,
            udpaddr: None,
            udpport: None,
            tcpport: None,
            tcp_password: None,
            buffer_input: false,
            binary_concat: true,
            live_stream: 0,

            tlt_page: None,

            subs_delay_ms: 0,

            debug_mask: DebugMask::default(),
        }
    }
}

impl Config {
    /// Validates cross-option invariants, returning a `Configuration`
    /// error describing the first contradiction found. Mirrors the
    /// start-up checks the design calls out (e.g. spupng + stdout,
    /// RCWT in+out without an explicit output path).
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CcxError;

        if self.write_format == WriteFormat::SpuPng && self.output_filename.is_none() {
            return Err(CcxError::Configuration(
                "spupng output requires an explicit output path (cannot write to stdout)".into(),
            ));
        }
        if !(1..=4).contains(&self.cc_channel) {
            return Err(CcxError::Configuration(format!(
                "cc_channel must be 1..=4, got {}",
                self.cc_channel
            )));
        }
        if self.forced_ru > 3 {
            return Err(CcxError::Configuration(format!(
                "forced_ru must be 0..=3, got {}",
                self.forced_ru
            )));
        }
        if self.input_source == InputSource::Udp && self.udpport.is_none() {
            return Err(CcxError::Configuration(
                "udp input source requires udpport".into(),
            ));
        }
        if self.input_source == InputSource::Tcp && self.tcpport.is_none() {
            return Err(CcxError::Configuration(
                "tcp input source requires tcpport".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn spupng_requires_output_path() {
        let mut cfg = Config::default();
        cfg.write_format = WriteFormat::SpuPng;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_channel_rejected() {
        let mut cfg = Config::default();
        cfg.cc_channel = 9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_mask_has() {
        let mask = DebugMask(DebugMask::PAT | DebugMask::PMT);
        assert!(mask.has(DebugMask::PAT));
        assert!(!mask.has(DebugMask::CEA608));
    }
}

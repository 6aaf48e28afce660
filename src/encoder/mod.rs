//! # Subtitle encoders
//!
//! Turns decoded [`crate::cea608::decoder::Cea608Screen`]s and
//! [`crate::cea708::Cea708Screen`]s into one of the output formats the
//! design's external-interfaces section enumerates. One encoder instance
//! is created per output channel (field 1, field 2, or a 708 service
//! number) so that, e.g., CC1 and CC2 land in separate `.srt` files.
//!
//! Grounded on `original_source/src/lib_ccx/general_loop.c`'s
//! `writercwtdata`/per-format dispatch and the individual writers under
//! `original_source/src/lib_ccx/ccx_encoders_*.c`.

pub mod credits;
pub mod raw;
pub mod rcwt;
pub mod sami;
pub mod spupng;
pub mod srt;
pub mod transcript;
pub mod ttml;

use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::config::{Config, Encoding, WriteFormat};
use crate::error::Result;

/// Common contract every output-format writer implements. One instance
/// per output channel; `finish` is called once at EOF (or stream switch)
/// and returns the complete byte stream produced so far, leaving the
/// encoder in a valid-but-empty state so a caller that calls it early by
/// mistake doesn't panic.
pub trait SubtitleEncoder: Send {
    /// Encodes one completed CEA-608 screen.
    fn encode_608(&mut self, screen: &Cea608Screen) -> Result<()>;

    /// Encodes one completed CEA-708 screen.
    fn encode_708(&mut self, screen: &Cea708Screen) -> Result<()>;

    /// Appends any trailing epilogue (closing tags, a final empty SAMI
    /// SYNC block, ...) and returns everything produced so far.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// Renders `ms` (clamped to non-negative) as `HH:MM:SS<sep>mmm`.
pub fn format_timestamp(ms: i64, millis_separator: char) -> String {
    let ms = ms.max(0);
    let whole_ms = ms % 1000;
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02}{millis_separator}{whole_ms:03}")
}

/// A growable text buffer that defers encoding-scheme conversion (UTF-8
/// BOM / UTF-16LE BOM / Latin-1) to [`WriteCtx::into_bytes`], so every
/// format writer can just push `&str`s.
#[derive(Debug, Default)]
pub struct WriteCtx {
    buf: String,
    encoding: Encoding,
    newline: &'static str,
}

impl WriteCtx {
    pub fn new(encoding: Encoding, line_terminator_lf: bool) -> Self {
        Self {
            buf: String::new(),
            encoding,
            newline: if line_terminator_lf { "\n" } else { "\r\n" },
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// Pushes `s` followed by the configured line terminator.
    pub fn push_line(&mut self, s: &str) {
        self.buf.push_str(s);
        self.buf.push_str(self.newline);
    }

    /// A bare line terminator, for the blank line between SRT blocks.
    pub fn push_blank(&mut self) {
        self.buf.push_str(self.newline);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drains the buffer and encodes it per the configured `Encoding`,
    /// including the leading BOM for `Utf8`/`Utf16Le`. Leaves the
    /// context empty so repeated calls never duplicate a BOM.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        let text = std::mem::take(&mut self.buf);
        encode_text(&text, self.encoding)
    }
}

fn encode_text(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => {
            let mut out = vec![0xEF, 0xBB, 0xBF];
            out.extend_from_slice(text.as_bytes());
            out
        }
        Encoding::Utf16Le => {
            let mut out = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        Encoding::Latin1 => text
            .chars()
            .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
            .collect(),
    }
}

/// Builds the right encoder for `cfg.write_format`, keyed on an output
/// channel label (`"CC1"`, `"CC2"`, `"708-3"`, ...) used by formats that
/// embed it (the SAMI `Class` attribute, the transcript `source` column).
pub fn new_encoder(cfg: &Config, channel_label: String) -> Box<dyn SubtitleEncoder> {
    match cfg.write_format {
        WriteFormat::Srt => Box::new(srt::SrtEncoder::new(cfg)),
        WriteFormat::Sami => Box::new(sami::SamiEncoder::new(cfg, channel_label)),
        WriteFormat::SmpteTt => Box::new(ttml::TtmlEncoder::new(cfg)),
        WriteFormat::Transcript => Box::new(transcript::TranscriptEncoder::new(cfg, channel_label)),
        WriteFormat::Rcwt => Box::new(rcwt::RcwtEncoder::new()),
        WriteFormat::Raw => Box::new(raw::RawEncoder::new(false)),
        WriteFormat::DvdRaw => Box::new(raw::RawEncoder::new(true)),
        WriteFormat::SpuPng => Box::new(spupng::SpuPngEncoder::new(cfg, channel_label)),
        WriteFormat::Null => Box::new(NullEncoder),
    }
}

/// Discards every screen; used for throughput testing (`WriteFormat::Null`).
#[derive(Debug, Default)]
struct NullEncoder;

impl SubtitleEncoder for NullEncoder {
    fn encode_608(&mut self, _screen: &Cea608Screen) -> Result<()> {
        Ok(())
    }
    fn encode_708(&mut self, _screen: &Cea708Screen) -> Result<()> {
        Ok(())
    }
    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_timestamp_pads_fields() {
        assert_eq!(format_timestamp(3_661_042, ','), "01:01:01,042");
        assert_eq!(format_timestamp(0, ','), "00:00:00,000");
    }

    #[test]
    fn negative_ms_clamps_to_zero() {
        assert_eq!(format_timestamp(-5, ','), "00:00:00,000");
    }

    #[test]
    fn write_ctx_prepends_utf8_bom() {
        let mut ctx = WriteCtx::new(Encoding::Utf8, false);
        ctx.push_line("hello");
        let bytes = ctx.take_bytes();
        assert_eq!(&bytes[0..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(&bytes[3..], b"hello\r\n");
    }

    #[test]
    fn write_ctx_latin1_substitutes_unmappable_chars() {
        let mut ctx = WriteCtx::new(Encoding::Latin1, true);
        ctx.push_str("caf\u{00e9} \u{4e2d}");
        let bytes = ctx.take_bytes();
        assert_eq!(bytes, b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn null_encoder_produces_nothing() {
        let mut enc = NullEncoder;
        assert!(enc.finish().unwrap().is_empty());
    }
}

//! # Plain transcript encoder
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_transcript.c`:
//! one pipe-separated line per non-empty row, carrying start/end
//! timestamps, the output channel, and the decoder mode, with the date
//! field controlled by `Config::date_format`.

use super::{format_timestamp, SubtitleEncoder, WriteCtx};
use crate::cea608::decoder::{Cea608Screen, Mode};
use crate::cea708::Cea708Screen;
use crate::config::{Config, DateFormat};
use crate::error::Result;

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::PopOn => "POP",
        Mode::RollUp(_) => "RU",
        Mode::PaintOn => "PAI",
        Mode::Text => "TXT",
    }
}

pub struct TranscriptEncoder {
    ctx: WriteCtx,
    channel_label: String,
    date_format: DateFormat,
    millis_separator: char,
}

impl TranscriptEncoder {
    pub fn new(cfg: &Config, channel_label: String) -> Self {
        Self {
            ctx: WriteCtx::new(cfg.encoding, cfg.line_terminator_lf),
            channel_label,
            date_format: cfg.date_format,
            millis_separator: cfg.millis_separator,
        }
    }

    fn timestamp_field(&self, ms: i64) -> String {
        match self.date_format {
            DateFormat::None => String::new(),
            DateFormat::HhMmSs => format_timestamp(ms, ':')[..8].to_string(),
            DateFormat::HhMmSsMs => format_timestamp(ms, self.millis_separator),
            DateFormat::Seconds => format!("{:.3}", ms as f64 / 1000.0),
            DateFormat::Date => format_timestamp(ms, self.millis_separator),
        }
    }

    fn write_block(&mut self, start_ms: i64, end_ms: i64, mode: Mode, lines: &[String]) {
        for line in lines {
            if line.is_empty() {
                continue;
            }
            self.ctx.push_line(&format!(
                "{}|{}|{}|{}|{}",
                self.timestamp_field(start_ms),
                self.timestamp_field(end_ms),
                self.channel_label,
                mode_label(mode),
                line
            ));
        }
    }
}

impl SubtitleEncoder for TranscriptEncoder {
    fn encode_608(&mut self, screen: &Cea608Screen) -> Result<()> {
        self.write_block(screen.start_ms, screen.end_ms, screen.mode, &screen.lines);
        Ok(())
    }

    fn encode_708(&mut self, screen: &Cea708Screen) -> Result<()> {
        let lines: Vec<String> = screen.non_empty_lines().into_iter().map(|(_, t)| t).collect();
        self.write_block(screen.start_ms, screen.end_ms, Mode::PopOn, &lines);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(self.ctx.take_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cea608::grid::Cell;

    #[test]
    fn emits_one_pipe_separated_line_per_row() {
        let mut cfg = Config::default();
        cfg.date_format = DateFormat::HhMmSsMs;
        let mut enc = TranscriptEncoder::new(&cfg, "CC1".to_string());
        enc.encode_608(&Cea608Screen {
            lines: vec!["Hello".to_string(), "World".to_string()],
            cells: vec![vec![Cell::default()]],
            start_ms: 1000,
            end_ms: 2000,
            channel: 1,
            mode: Mode::PopOn,
        })
        .unwrap();
        let bytes = enc.finish().unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.contains("00:00:01,000|00:00:02,000|CC1|POP|Hello"));
        assert!(text.contains("00:00:01,000|00:00:02,000|CC1|POP|World"));
    }
}

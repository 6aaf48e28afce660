//! # SubRip (.srt) encoder
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_srt.c`.

use super::{format_timestamp, SubtitleEncoder, WriteCtx};
use crate::cea608::decoder::Cea608Screen;
use crate::cea608::grid::{Cea608Color, Cell};
use crate::cea708::Cea708Screen;
use crate::config::Config;
use crate::error::Result;

/// Maps a CEA-608 colour onto the HTML colour name SRT players expect in
/// a `<font color=...>` span.
fn color_name(color: Cea608Color) -> &'static str {
    match color {
        Cea608Color::White => "#ffffff",
        Cea608Color::Green => "#00ff00",
        Cea608Color::Blue => "#0000ff",
        Cea608Color::Cyan => "#00ffff",
        Cea608Color::Red => "#ff0000",
        Cea608Color::Yellow => "#ffff00",
        Cea608Color::Magenta => "#ff00ff",
    }
}

/// Renders one row's cells to text, wrapping contiguous runs that share
/// non-default colour/italics/underline in the matching HTML-ish spans.
/// Trailing blanks are trimmed before emitting, matching `to_lines`.
fn render_row(cells: &[Cell], nofontcolor: bool, notypesetting: bool) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < cells.len() {
        let run_start = i;
        let c = cells[i];
        while i < cells.len() && cells[i].color == c.color && cells[i].font == c.font {
            i += 1;
        }
        let run: String = cells[run_start..i].iter().map(|cell| cell.ch).collect();

        let needs_color = !nofontcolor && c.color != Cea608Color::White;
        let needs_italics = !notypesetting && c.font.italics;
        let needs_underline = !notypesetting && c.font.underline;

        if needs_color {
            out.push_str(&format!("<font color=\"{}\">", color_name(c.color)));
        }
        if needs_italics {
            out.push_str("<i>");
        }
        if needs_underline {
            out.push_str("<u>");
        }
        out.push_str(&run);
        if needs_underline {
            out.push_str("</u>");
        }
        if needs_italics {
            out.push_str("</i>");
        }
        if needs_color {
            out.push_str("</font>");
        }
    }
    out.trim_end().to_string()
}

pub struct SrtEncoder {
    ctx: WriteCtx,
    counter: u32,
    millis_separator: char,
    nofontcolor: bool,
    notypesetting: bool,
    autodash: bool,
    last_text: Option<String>,
}

impl SrtEncoder {
    pub fn new(cfg: &Config) -> Self {
        Self {
            ctx: WriteCtx::new(cfg.encoding, cfg.line_terminator_lf),
            counter: 0,
            millis_separator: cfg.millis_separator,
            nofontcolor: cfg.nofontcolor,
            notypesetting: cfg.notypesetting,
            autodash: cfg.autodash,
            last_text: None,
        }
    }

    fn write_block(&mut self, start_ms: i64, end_ms: i64, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.counter += 1;
        self.ctx.push_line(&self.counter.to_string());
        self.ctx.push_line(&format!(
            "{} --> {}",
            format_timestamp(start_ms, self.millis_separator),
            format_timestamp(end_ms, self.millis_separator)
        ));
        let joined = lines.join("\n");
        let changed = self.last_text.as_deref() != Some(joined.as_str());
        for (i, line) in lines.iter().enumerate() {
            if self.autodash && changed && i == 0 {
                self.ctx.push_line(&format!("- {line}"));
            } else {
                self.ctx.push_line(line);
            }
        }
        self.ctx.push_blank();
        self.last_text = Some(joined);
    }
}

impl SubtitleEncoder for SrtEncoder {
    fn encode_608(&mut self, screen: &Cea608Screen) -> Result<()> {
        let lines: Vec<String> = screen
            .cells
            .iter()
            .map(|row| render_row(row, self.nofontcolor, self.notypesetting))
            .collect();
        self.write_block(screen.start_ms, screen.end_ms, &lines);
        Ok(())
    }

    fn encode_708(&mut self, screen: &Cea708Screen) -> Result<()> {
        let lines: Vec<String> = screen.non_empty_lines().into_iter().map(|(_, t)| t).collect();
        self.write_block(screen.start_ms, screen.end_ms, &lines);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(self.ctx.take_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cea608::decoder::Mode;
    use crate::config::Encoding;

    fn screen(lines: Vec<&str>, start_ms: i64, end_ms: i64) -> Cea608Screen {
        let cells = lines
            .iter()
            .map(|l| {
                l.chars()
                    .map(|ch| Cell { ch, ..Default::default() })
                    .collect()
            })
            .collect();
        Cea608Screen {
            lines: lines.into_iter().map(String::from).collect(),
            cells,
            start_ms,
            end_ms,
            channel: 1,
            mode: Mode::PopOn,
        }
    }

    #[test]
    fn emits_numbered_timed_blocks() {
        let mut cfg = Config::default();
        cfg.encoding = Encoding::Utf8;
        let mut enc = SrtEncoder::new(&cfg);
        enc.encode_608(&screen(vec!["Hello"], 0, 1000)).unwrap();
        enc.encode_608(&screen(vec!["World"], 1000, 2000)).unwrap();
        let bytes = enc.finish().unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.starts_with("1\r\n00:00:00,000 --> 00:00:01,000\r\nHello\r\n\r\n2\r\n"));
        assert!(text.contains("World"));
    }

    #[test]
    fn colored_cell_gets_a_font_span() {
        let mut cells = vec![Cell { ch: 'H', ..Default::default() }];
        cells.push(Cell {
            ch: 'i',
            color: Cea608Color::Red,
            ..Default::default()
        });
        let row = render_row(&cells, false, false);
        assert_eq!(row, "H<font color=\"#ff0000\">i</font>");
    }

    #[test]
    fn nofontcolor_suppresses_spans() {
        let cells = vec![Cell {
            ch: 'X',
            color: Cea608Color::Red,
            ..Default::default()
        }];
        assert_eq!(render_row(&cells, true, false), "X");
    }
}

//! # SMPTE Timed Text (TTML) encoder
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_splet.c`'s TTML
//! path: a `<tt><body><div>` document with one `<p begin=... end=...>`
//! per screen, using `<br/>` between the screen's lines.

use super::{SubtitleEncoder, WriteCtx};
use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::config::Config;
use crate::error::Result;

const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n",
    "<tt xmlns=\"http://www.w3.org/ns/ttml\" xml:lang=\"en\">\r\n",
    "<body>\r\n<div>\r\n",
);
const FOOTER: &str = "</div>\r\n</body>\r\n</tt>\r\n";

fn ttml_time(ms: i64) -> String {
    super::format_timestamp(ms, '.')
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub struct TtmlEncoder {
    ctx: WriteCtx,
}

impl TtmlEncoder {
    pub fn new(cfg: &Config) -> Self {
        let mut ctx = WriteCtx::new(cfg.encoding, cfg.line_terminator_lf);
        ctx.push_str(HEADER);
        Self { ctx }
    }

    fn write_block(&mut self, start_ms: i64, end_ms: i64, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.ctx.push_str(&format!(
            "<p begin=\"{}\" end=\"{}\">",
            ttml_time(start_ms),
            ttml_time(end_ms)
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.ctx.push_str("<br/>");
            }
            self.ctx.push_str(&escape(line));
        }
        self.ctx.push_line("</p>");
    }
}

impl SubtitleEncoder for TtmlEncoder {
    fn encode_608(&mut self, screen: &Cea608Screen) -> Result<()> {
        self.write_block(screen.start_ms, screen.end_ms, &screen.lines);
        Ok(())
    }

    fn encode_708(&mut self, screen: &Cea708Screen) -> Result<()> {
        let lines: Vec<String> = screen.non_empty_lines().into_iter().map(|(_, t)| t).collect();
        self.write_block(screen.start_ms, screen.end_ms, &lines);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.ctx.push_str(FOOTER);
        Ok(self.ctx.take_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cea608::decoder::Mode;

    #[test]
    fn emits_a_paragraph_per_screen_with_ttml_timestamps() {
        let cfg = Config::default();
        let mut enc = TtmlEncoder::new(&cfg);
        enc.encode_608(&Cea608Screen {
            lines: vec!["Hi".to_string(), "there".to_string()],
            cells: vec![],
            start_ms: 1500,
            end_ms: 2500,
            channel: 1,
            mode: Mode::PopOn,
        })
        .unwrap();
        let bytes = enc.finish().unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(text.contains("<p begin=\"00:00:01.500\" end=\"00:00:02.500\">Hi<br/>there</p>"));
        assert!(text.trim_end().ends_with("</tt>"));
    }
}

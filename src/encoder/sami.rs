//! # SAMI (.smi) encoder
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_sami.c`: a
//! `<SAMI>` document with a fixed `CC1`/`CC2`/`ENCC1` style sheet, one
//! `<SYNC Start=ms>` block per screen, and a trailing empty `<SYNC>` at
//! the last screen's end time to turn captions off.

use super::{SubtitleEncoder, WriteCtx};
use crate::cea608::decoder::Cea608Screen;
use crate::cea708::Cea708Screen;
use crate::config::Config;
use crate::error::Result;

const PROLOGUE: &str = concat!(
    "<SAMI>\r\n<HEAD>\r\n<STYLE TYPE=\"text/css\">\r\n",
    "<!--\r\n",
    "P {margin-left: 16px; margin-right: 16px; margin-bottom: 16px;\r\n",
    "   margin-top: 8px; font-size: 18pt; text-align: center;\r\n",
    "   font-family: Arial; font-weight: bold; color: #f0f0f0;}\r\n",
    ".UNKNOWNCC {Name:Unknown; lang:en-US; SAMIType:CC;}\r\n",
    "-->\r\n</STYLE>\r\n</HEAD>\r\n\r\n<BODY>\r\n",
);

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub struct SamiEncoder {
    ctx: WriteCtx,
    class: String,
    last_end_ms: i64,
    wrote_any: bool,
}

impl SamiEncoder {
    pub fn new(cfg: &Config, channel_label: String) -> Self {
        let mut ctx = WriteCtx::new(cfg.encoding, cfg.line_terminator_lf);
        ctx.push_str(PROLOGUE);
        Self {
            ctx,
            class: channel_label,
            last_end_ms: 0,
            wrote_any: false,
        }
    }

    fn write_block(&mut self, start_ms: i64, end_ms: i64, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.ctx
            .push_line(&format!("<SYNC Start={start_ms}><P Class={}>", self.class));
        for line in lines {
            self.ctx.push_line(&escape(line));
            self.ctx.push_line("<br>");
        }
        self.ctx.push_line("</SYNC>");
        self.last_end_ms = self.last_end_ms.max(end_ms);
        self.wrote_any = true;
    }
}

impl SubtitleEncoder for SamiEncoder {
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
        if self.wrote_any {
            self.ctx
                .push_line(&format!("<SYNC Start={}><P Class={}>&nbsp;</SYNC>", self.last_end_ms, self.class));
        }
        self.ctx.push_line("</BODY>\r\n</SAMI>");
        Ok(self.ctx.take_bytes())
    }
}

//! The CEA-608 pop-on/roll-up/paint-on/text state machine.
//!
//! Grounded on `original_source/src/608.c`'s `process608` dispatch table,
//! split per the redesign notes into caption decoding and XDS handling
//! as two explicit entry points instead of one function serving both.

use super::charset::{basic_char, double_char, extended_char};
use super::grid::{Cea608Color, Cea608Grid, Cell, FontAttr};
use super::pac::decode_pac;
use super::xds::{XdsDecoder, XdsEvent};
use crate::cctriplet::{CaptionTriplet, CcType};
use crate::error::Result;

/// The four display modes a 608 channel can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    PopOn,
    RollUp(u8),
    PaintOn,
    Text,
}

/// A completed screen, ready for the encoder.
#[derive(Debug, Clone)]
pub struct Cea608Screen {
    pub lines: Vec<String>,
    /// Full 32-cell attribute runs for the same non-empty rows as `lines`,
    /// for encoders that emit colour/italic/underline spans.
    pub cells: Vec<Vec<Cell>>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub channel: u8,
    pub mode: Mode,
}

/// One 608 decoder context, covering one field (two channels: 1/3 or
/// 2/4, since the channel bit is carried in `b1`'s high bit).
pub struct Cea608Decoder {
    field: u8,
    displayed: Cea608Grid,
    non_displayed: Cea608Grid,
    mode: Mode,
    cursor_row: usize,
    cursor_col: usize,
    current_color: Cea608Color,
    current_font: FontAttr,
    active_channel: u8,
    selected_channel: u8,
    visible_start_ms: i64,
    last_pair: Option<(u8, u8)>,
    xds: XdsDecoder,
    xds_open: bool,
    forced_ru: Option<u8>,
}

impl Cea608Decoder {
    pub fn new(field: u8, selected_channel: u8) -> Self {
        Self {
            field,
            displayed: Cea608Grid::new(),
            non_displayed: Cea608Grid::new(),
            mode: Mode::PopOn,
            cursor_row: 14,
            cursor_col: 0,
            current_color: Cea608Color::White,
            current_font: FontAttr::default(),
            active_channel: 1,
            selected_channel,
            visible_start_ms: 0,
            last_pair: None,
            xds: XdsDecoder::new(),
            xds_open: false,
            forced_ru: None,
        }
    }

    /// Configures forced roll-up simplification (RU3->RU2, RU4->RU3, or
    /// any RU collapsed to a single "fake RU1" row count).
    pub fn set_forced_rollup(&mut self, rows: Option<u8>) {
        self.forced_ru = rows;
    }

    /// Feeds one caption triplet. `current_ms` is this frame's
    /// presentation time, used to stamp `visible_start_ms` on buffer
    /// swaps. Returns any screen emitted as a side effect, and any XDS
    /// activity event (field 2 only).
    pub fn feed(
        &mut self,
        triplet: &CaptionTriplet,
        current_ms: i64,
    ) -> Result<(Option<Cea608Screen>, Option<XdsEvent>)> {
        if !matches!(triplet.cc_type, CcType::NtscF1 | CcType::NtscF2) {
            return Ok((None, None));
        }
        if !triplet.cc_valid {
            return Ok((None, None));
        }

        let (b1, b2) = (triplet.b1 & 0x7F, triplet.b2 & 0x7F);

        // Once an XDS packet is open, every following byte pair belongs to
        // it (plain ASCII payload included) until the close code `0x0F`
        // arrives; only otherwise do we gate on the open/close control
        // range, since a data pair's `b1` can fall anywhere in 0x20..=0x7F.
        if self.field == 2 && (self.xds_open || (0x01..=0x0F).contains(&b1)) {
            if (0x01..=0x0D).contains(&b1) && b1 % 2 == 1 {
                self.xds_open = true;
            }
            let (packet, _) = self.xds.feed(b1, b2);
            if b1 == 0x0F {
                self.xds_open = false;
            }
            let event = packet.as_ref().and_then(|p| self.xds.interpret(p));
            return Ok((None, event));
        }

        if (0x10..=0x1F).contains(&b1) && (0x20..=0x7F).contains(&b2) {
            // High bit of b1 selects channel 1 vs 3 on field 1, or 2 vs 4
            // on field 2.
            let channel = match (self.field, b1 & 0x08 != 0) {
                (1, false) => 1,
                (1, true) => 3,
                (2, false) => 2,
                (2, true) => 4,
                _ => 1,
            };
            if Some((b1, b2)) == self.last_pair {
                self.last_pair = None;
                return Ok((None, None));
            }
            self.last_pair = Some((b1, b2));
            self.active_channel = channel;
            if channel != self.selected_channel {
                return Ok((None, None));
            }
            let screen = self.dispatch_control(b1, b2, current_ms)?;
            return Ok((screen, None));
        }
        self.last_pair = None;

        if self.active_channel != self.selected_channel {
            return Ok((None, None));
        }

        self.write_basic_pair(b1, b2);
        Ok((None, None))
    }

    fn write_basic_pair(&mut self, b1: u8, b2: u8) {
        self.put_char(basic_char(b1));
        if b2 != 0 {
            self.put_char(basic_char(b2));
        }
    }

    fn put_char(&mut self, ch: char) {
        let target = self.target_grid_mut();
        target.set(
            self.cursor_row,
            self.cursor_col,
            Cell {
                ch,
                color: self.current_color,
                font: self.current_font,
            },
        );
        if self.cursor_col < 31 {
            self.cursor_col += 1;
        }
    }

    fn target_grid_mut(&mut self) -> &mut Cea608Grid {
        match self.mode {
            Mode::PopOn => &mut self.non_displayed,
            Mode::RollUp(_) | Mode::PaintOn | Mode::Text => &mut self.displayed,
        }
    }

    fn dispatch_control(&mut self, b1: u8, b2: u8, current_ms: i64) -> Result<Option<Cea608Screen>> {
        if let Some(pac) = decode_pac(b1, b2) {
            return Ok(self.apply_pac(pac));
        }

        let masked = b1 & 0x17;
        if (masked == 0x11 || masked == 0x19) && (0x20..=0x2F).contains(&b2) {
            self.apply_midrow(b2);
            return Ok(None);
        }
        if (masked == 0x12 || masked == 0x13) && (0x20..=0x3F).contains(&b2) {
            if self.cursor_col > 0 {
                self.cursor_col -= 1;
            }
            self.put_char(extended_char(b2));
            return Ok(None);
        }
        if (masked == 0x11 || masked == 0x19) && (0x30..=0x3F).contains(&b2) {
            self.put_char(double_char(b2));
            return Ok(None);
        }

        self.apply_global_command(masked, b2, current_ms)
    }

    fn apply_pac(&mut self, pac: super::pac::PacResult) -> Option<Cea608Screen> {
        self.current_color = pac.color;
        self.current_font = pac.font;
        self.cursor_col = pac.indent.min(31) as usize;

        match self.mode {
            Mode::Text => {
                // Row is discarded; column is kept.
            }
            Mode::RollUp(_) => {
                let row = (pac.row as usize).saturating_sub(1).min(14);
                self.cursor_row = row;
                for r in (row + 1)..15 {
                    self.displayed.clear_row(r);
                }
            }
            Mode::PopOn | Mode::PaintOn => {
                self.cursor_row = (pac.row as usize).saturating_sub(1).min(14);
            }
        }
        None
    }

    fn apply_midrow(&mut self, b2: u8) {
        let index = (b2 - 0x20) >> 1;
        let italics = index == 0x0E >> 1 || b2 == 0x2E || b2 == 0x2F;
        self.current_color = match index {
            0 => Cea608Color::White,
            1 => Cea608Color::Green,
            2 => Cea608Color::Blue,
            3 => Cea608Color::Cyan,
            4 => Cea608Color::Red,
            5 => Cea608Color::Yellow,
            6 => Cea608Color::Magenta,
            _ => Cea608Color::White,
        };
        self.current_font = FontAttr {
            italics,
            underline: b2 & 0x01 != 0,
        };
        self.put_char(' ');
    }

    fn effective_rollup_size(&self, requested: u8) -> u8 {
        self.forced_ru.map(|fake| fake.min(requested)).unwrap_or(requested)
    }

    fn apply_global_command(&mut self, masked: u8, b2: u8, current_ms: i64) -> Result<Option<Cea608Screen>> {
        if masked != 0x14 && masked != 0x15 && masked != 0x1C && masked != 0x1D {
            return Ok(None);
        }

        match b2 {
            0x20 => {
                self.mode = Mode::PopOn;
                Ok(None)
            }
            0x2F => {
                std::mem::swap(&mut self.displayed, &mut self.non_displayed);
                let screen = self.emit_screen(current_ms);
                self.non_displayed.clear();
                self.cursor_row = 14;
                self.cursor_col = 0;
                self.current_color = Cea608Color::White;
                self.current_font = FontAttr::default();
                self.mode = Mode::PopOn;
                self.visible_start_ms = current_ms;
                Ok(screen)
            }
            0x25 | 0x26 | 0x27 => {
                let rows = match b2 {
                    0x25 => 2,
                    0x26 => 3,
                    _ => 4,
                };
                let rows = self.effective_rollup_size(rows);
                let was_pop_or_paint = matches!(self.mode, Mode::PopOn | Mode::PaintOn);
                let mut emitted = None;
                if was_pop_or_paint {
                    emitted = self.emit_screen(current_ms);
                    self.displayed.clear();
                    self.non_displayed.clear();
                }
                self.mode = Mode::RollUp(rows);
                self.cursor_row = 14;
                self.cursor_col = 0;
                Ok(emitted)
            }
            0x2D => {
                let screen = if let Mode::RollUp(rows) = self.mode {
                    let emitted = self.emit_screen(current_ms);
                    self.displayed.scroll_up(self.cursor_row, rows as usize);
                    self.visible_start_ms = current_ms;
                    emitted
                } else {
                    None
                };
                self.cursor_col = 0;
                Ok(screen)
            }
            0x2C => {
                let screen = self.emit_screen(current_ms);
                self.displayed.clear();
                self.visible_start_ms = current_ms;
                Ok(screen)
            }
            0x2E => {
                self.non_displayed.clear();
                Ok(None)
            }
            0x24 => {
                self.target_grid_mut().clear_row_from(self.cursor_row, self.cursor_col);
                Ok(None)
            }
            0x29 => {
                self.mode = Mode::PaintOn;
                Ok(None)
            }
            0x2B => {
                self.mode = Mode::Text;
                Ok(None)
            }
            0x21 | 0x22 | 0x23 => {
                let tab = match b2 {
                    0x21 => 1,
                    0x22 => 2,
                    _ => 3,
                };
                self.cursor_col = (self.cursor_col + tab).min(31);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn emit_screen(&mut self, current_ms: i64) -> Option<Cea608Screen> {
        if self.displayed.is_empty() {
            return None;
        }
        Some(Cea608Screen {
            lines: self.displayed.to_lines(),
            cells: self.displayed.to_rich_lines(),
            start_ms: self.visible_start_ms,
            end_ms: current_ms,
            channel: self.selected_channel,
            mode: self.mode,
        })
    }
}

/// Applies sentence-case post-processing: capitalises the first letter
/// after `.?!:`, lower-cases the rest.
pub fn sentence_case(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut capitalize_next = true;
    for ch in line.chars() {
        if capitalize_next && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            out.extend(ch.to_lowercase());
        }
        if matches!(ch, '.' | '?' | '!' | ':') {
            capitalize_next = true;
        }
    }
    out
}

/// Applies [`sentence_case`] to a whole screen in place, keeping both
/// text representations in lockstep: the plain `lines` most encoders
/// read, and the `cells` grid the SRT encoder reads to keep colour/italic
/// spans attached to the right characters. `Cell::ch` holds exactly one
/// character, so the cell pass uses ASCII case-folding rather than
/// `sentence_case`'s Unicode-aware one; for ordinary caption text the two
/// agree.
pub fn apply_sentence_case(screen: &mut Cea608Screen) {
    for line in screen.lines.iter_mut() {
        *line = sentence_case(line);
    }
    for row in screen.cells.iter_mut() {
        let mut capitalize_next = true;
        for cell in row.iter_mut() {
            match cell.ch {
                ' ' | '-' => {}
                '.' | '?' | '!' | ':' => capitalize_next = true,
                ch => {
                    cell.ch = if capitalize_next {
                        ch.to_ascii_uppercase()
                    } else {
                        ch.to_ascii_lowercase()
                    };
                    capitalize_next = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(b1: u8, b2: u8) -> CaptionTriplet {
        CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::NtscF1,
            b1,
            b2,
        }
    }

    #[test]
    fn pop_on_scenario_emits_screen_on_eoc() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap(); // RCL -> PopOn
        dec.feed(&pair(0x13, 0x40), 100).unwrap(); // PAC row 15 white
        dec.feed(&pair(b'H', b'I'), 200).unwrap();
        let (screen, _) = dec.feed(&pair(0x14, 0x2F), 2000).unwrap(); // EOC
        let screen = screen.expect("EOC should emit the populated buffer");
        assert_eq!(screen.lines, vec!["HI".to_string()]);
    }

    #[test]
    fn consecutive_pop_on_screens_are_gapless() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap(); // RCL -> PopOn
        dec.feed(&pair(0x13, 0x40), 0).unwrap(); // PAC row 15
        dec.feed(&pair(b'H', b'I'), 0).unwrap();
        let (first, _) = dec.feed(&pair(0x14, 0x2F), 2000).unwrap(); // EOC
        let first = first.expect("first EOC should emit a screen");

        dec.feed(&pair(0x13, 0x40), 2000).unwrap(); // PAC row 15 again
        dec.feed(&pair(b'B', b'Y'), 2000).unwrap(); // "BY" into the non-visible buffer
        let (second, _) = dec.feed(&pair(0x14, 0x2F), 5000).unwrap(); // EOC
        let second = second.expect("second EOC should emit a screen");

        assert_eq!(first.end_ms, second.start_ms);
    }

    #[test]
    fn roll_up_2_scenario_scrolls_on_carriage_return() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x25), 0).unwrap(); // RU2
        dec.feed(&pair(0x13, 0x40), 0).unwrap(); // PAC row 15
        dec.feed(&pair(b'A', b' '), 0).unwrap();
        dec.feed(&pair(0x14, 0x2D), 100).unwrap(); // CR
        dec.feed(&pair(b'B', b' '), 100).unwrap();
        assert!(matches!(dec.mode, Mode::RollUp(2)));
    }

    #[test]
    fn duplicate_control_pair_is_suppressed_once() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap();
        let before = dec.mode;
        dec.mode = Mode::PaintOn;
        dec.feed(&pair(0x14, 0x20), 0).unwrap();
        assert_eq!(dec.mode, Mode::PaintOn);
        let _ = before;
    }

    #[test]
    fn sentence_case_capitalizes_after_terminators() {
        assert_eq!(sentence_case("HELLO. WORLD"), "Hello. World");
    }

    #[test]
    fn apply_sentence_case_is_idempotent() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap(); // RCL -> PopOn
        dec.feed(&pair(0x13, 0x40), 0).unwrap(); // PAC row 15
        for (b1, b2) in [(b'H', b'E'), (b'L', b'L'), (b'O', b'!')] {
            dec.feed(&pair(b1, b2), 0).unwrap();
        }
        let (screen, _) = dec.feed(&pair(0x14, 0x2F), 2000).unwrap(); // EOC
        let mut screen = screen.unwrap();

        apply_sentence_case(&mut screen);
        let once_lines = screen.lines.clone();
        let once_cells = screen.cells.clone();

        apply_sentence_case(&mut screen);
        assert_eq!(screen.lines, once_lines);
        assert_eq!(screen.cells, once_cells);
        assert_eq!(once_lines, vec!["Hello!".to_string()]);
    }

    #[test]
    fn channel_filter_drops_other_channel_text() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x1C, 0x20), 0).unwrap(); // channel 2 RCL (b1 high bit set)
        dec.feed(&pair(b'X', b'Y'), 0).unwrap();
        assert!(dec.non_displayed.is_empty());
    }

    #[test]
    fn foreign_channel_control_codes_do_not_touch_state() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap(); // RCL -> PopOn, channel 1
        dec.feed(&pair(0x13, 0x40), 0).unwrap(); // PAC row 15, channel 1
        dec.feed(&pair(b'H', b'I'), 0).unwrap();
        let (screen, _) = dec.feed(&pair(0x14, 0x2F), 2000).unwrap(); // EOC, channel 1
        assert!(screen.is_some());
        assert!(!dec.displayed.is_empty());

        // 0x1C carries the channel-3 selector bit; this decoder only
        // watches channel 1, so its EDM must not wipe the buffer.
        let (screen, _) = dec.feed(&pair(0x1C, 0x2C), 3000).unwrap();
        assert!(screen.is_none());
        assert!(!dec.displayed.is_empty());
    }

    #[test]
    fn edm_clears_the_displayed_buffer() {
        let mut dec = Cea608Decoder::new(1, 1);
        dec.feed(&pair(0x14, 0x20), 0).unwrap(); // RCL -> PopOn
        dec.feed(&pair(0x13, 0x40), 0).unwrap(); // PAC row 15
        dec.feed(&pair(b'H', b'I'), 0).unwrap();
        dec.feed(&pair(0x14, 0x2F), 2000).unwrap(); // EOC, swaps to displayed
        assert!(!dec.displayed.is_empty());

        let (screen, _) = dec.feed(&pair(0x14, 0x2C), 3000).unwrap(); // EDM
        assert!(screen.is_some(), "EDM should flush the visible buffer first");
        assert!(dec.displayed.is_empty());
    }

    fn field2(b1: u8, b2: u8) -> CaptionTriplet {
        CaptionTriplet {
            cc_valid: true,
            cc_type: CcType::NtscF2,
            b1,
            b2,
        }
    }

    #[test]
    fn xds_data_bytes_reach_the_packet_not_the_caption_path() {
        // "Star Tre" + two continuation codes + "k" + checksum-closed, per
        // the program-name scenario. `b1` values like b'S' (0x53) fall
        // outside 0x01..=0x0F, so they only reach the XDS packet while
        // `xds_open` tracking is in effect.
        let mut dec = Cea608Decoder::new(2, 2);
        dec.feed(&field2(0x01, 0x03), 0).unwrap();
        for &(b1, b2) in &[(b'S', b't'), (b'a', b'r'), (b' ', b'T'), (b'r', b'e')] {
            let (_, event) = dec.feed(&field2(b1, b2), 0).unwrap();
            assert!(event.is_none());
        }
        dec.feed(&field2(0x02, 0x03), 0).unwrap();
        dec.feed(&field2(0x02, 0x03), 0).unwrap();
        dec.feed(&field2(b'k', 0x00), 0).unwrap();
        let (_, event) = dec.feed(&field2(0x0F, 0x13), 0).unwrap();
        assert_eq!(event, Some(XdsEvent::ProgramName("Star Trek".into())));
    }
}

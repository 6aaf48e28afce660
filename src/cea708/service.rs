//! Per-service DTVCC decode loop: C0/C1/G0/G1/G2/G3 code dispatch,
//! window commands, and pen/text state.

use super::window::{Cea708Window, PenAttr, PenColor, PrintDirection, WindowAttrs};

const NUM_WINDOWS: usize = 8;

/// One service's windows and decode cursor state.
pub struct Cea708ServiceDecoder {
    pub windows: Vec<Cea708Window>,
    pub current_window: Option<usize>,
    aborted_block: bool,
}

impl Cea708ServiceDecoder {
    pub fn new() -> Self {
        Self {
            windows: (0..NUM_WINDOWS).map(|_| Cea708Window::new()).collect(),
            current_window: None,
            aborted_block: false,
        }
    }

    /// Decodes one service block's worth of bytes. Returns `true` if any
    /// window's visible/populated state changed in a way that should
    /// trigger a TV-grid recomposite.
    pub fn decode_block(&mut self, data: &[u8]) -> bool {
        self.aborted_block = false;
        let mut changed = false;
        let mut i = 0;
        while i < data.len() && !self.aborted_block {
            let c = data[i];
            i += 1;
            match c {
                0x00..=0x0F => {
                    i += self.decode_c0(c, &data[i..]);
                }
                0x10 => {
                    i += self.decode_ext1(&data[i..]);
                }
                0x11..=0x1F => {
                    // Reserved C0 extension range; no-op, 0 extra bytes.
                }
                0x20..=0x7F => {
                    self.write_g0(c);
                }
                0x80..=0x9F => {
                    let (consumed, did_change) = self.decode_c1(c, &data[i..]);
                    i += consumed;
                    changed |= did_change;
                }
                0xA0..=0xFF => {
                    // G1 extended Latin; approximate as the basic 608
                    // charset override table for the common accents.
                    self.write_g0(crate::cea608::charset::basic_char(c & 0x7F));
                }
            }
        }
        changed
    }

    fn decode_c0(&mut self, c: u8, _rest: &[u8]) -> usize {
        match c {
            0x0D => {
                if let Some(idx) = self.current_window {
                    self.windows[idx].carriage_return();
                }
                0
            }
            0x0C => {
                if let Some(idx) = self.current_window {
                    self.windows[idx].form_feed();
                }
                0
            }
            0x18 => 2, // P16: 16-bit character, currently unused.
            0x08..=0x0B => 0,
            0x01..=0x07 => 0,
            0x0E..=0x0F => 0,
            _ => 0,
        }
    }

    fn decode_ext1(&mut self, rest: &[u8]) -> usize {
        let Some(&b) = rest.first() else { return 0 };
        match b {
            0x20..=0x7F => {
                // G2: a small symbol table; approximate unknowns as '?'.
                self.write_g0(match b {
                    0x25 => '…',
                    0x2A => 'Š',
                    0x30 => '⅛',
                    0x31 => '⅜',
                    0x32 => '⅝',
                    0x33 => '⅞',
                    0x39 => '♪',
                    _ => '?',
                });
                1
            }
            0xA0 => {
                self.write_g0('▣'); // [CC] icon placeholder glyph.
                1
            }
            0xA1..=0xFF => 1,
            0x80..=0x8F => 4, // C3 fixed-length extended commands; 4 bytes total including this one.
            0x90..=0x9F => {
                // C3 variable-length extended commands: length isn't
                // derivable without decoding them, so abort the rest of
                // this service block rather than misparse it.
                self.abort_current_block();
                1
            }
            0x00..=0x1F => {
                let extra = match b {
                    0x00..=0x07 => 0,
                    0x08..=0x0F => 1,
                    0x10..=0x17 => 2,
                    _ => 3,
                };
                1 + extra
            }
        }
    }

    fn decode_c1(&mut self, c: u8, rest: &[u8]) -> (usize, bool) {
        match c {
            0x80..=0x87 => {
                let n = (c - 0x80) as usize;
                if self.windows.get(n).map(|w| w.defined).unwrap_or(false) {
                    self.current_window = Some(n);
                }
                (0, false)
            }
            0x88 => {
                let bitmap = rest.first().copied().unwrap_or(0);
                for n in 0..NUM_WINDOWS {
                    if bitmap & (1 << n) != 0 {
                        self.windows[n].form_feed();
                    }
                }
                (1, false)
            }
            0x89 => {
                let bitmap = rest.first().copied().unwrap_or(0);
                let mut changed = false;
                for n in 0..NUM_WINDOWS {
                    if bitmap & (1 << n) != 0 && !self.windows[n].visible {
                        self.windows[n].visible = true;
                        changed = true;
                    }
                }
                (1, changed)
            }
            0x8A => {
                let bitmap = rest.first().copied().unwrap_or(0);
                let mut changed = false;
                for n in 0..NUM_WINDOWS {
                    if bitmap & (1 << n) != 0 && self.windows[n].visible && !self.windows[n].is_empty() {
                        self.windows[n].visible = false;
                        changed = true;
                    }
                }
                (1, changed)
            }
            0x8B => {
                let bitmap = rest.first().copied().unwrap_or(0);
                for n in 0..NUM_WINDOWS {
                    if bitmap & (1 << n) != 0 {
                        self.windows[n].visible = !self.windows[n].visible;
                    }
                }
                (1, true)
            }
            0x8C => {
                let bitmap = rest.first().copied().unwrap_or(0);
                for n in 0..NUM_WINDOWS {
                    if bitmap & (1 << n) != 0 {
                        self.windows[n].defined = false;
                        self.windows[n].visible = false;
                    }
                }
                (1, true)
            }
            0x8D => (1, false), // DLY: noted, not implemented.
            0x8E => (0, false),
            0x8F => {
                for w in &mut self.windows {
                    *w = Cea708Window::new();
                }
                self.current_window = None;
                (0, true)
            }
            0x90 => {
                if let Some(idx) = self.current_window {
                    self.windows[idx].pen_attr = PenAttr {
                        italics: rest.first().map(|b| b & 0x01 != 0).unwrap_or(false),
                        underline: rest.get(1).map(|b| b & 0x01 != 0).unwrap_or(false),
                    };
                }
                (2, false)
            }
            0x91 => {
                if let Some(idx) = self.current_window {
                    self.windows[idx].pen_color = PenColor {
                        fg: rest.first().copied().unwrap_or(0) & 0x3F,
                        bg: rest.get(1).copied().unwrap_or(0) & 0x3F,
                        edge: rest.get(2).copied().unwrap_or(0) & 0x3F,
                    };
                }
                (3, false)
            }
            0x92 => {
                if let Some(idx) = self.current_window {
                    let row = rest.first().copied().unwrap_or(0) & 0x0F;
                    let col = rest.get(1).copied().unwrap_or(0) & 0x3F;
                    self.windows[idx].pen_row = row as usize;
                    self.windows[idx].pen_col = col as usize;
                }
                (2, false)
            }
            0x97 => {
                if let Some(idx) = self.current_window {
                    let direction_byte = rest.get(2).copied().unwrap_or(0);
                    let print_direction = match (direction_byte >> 2) & 0x03 {
                        0 => PrintDirection::LeftToRight,
                        1 => PrintDirection::RightToLeft,
                        2 => PrintDirection::TopToBottom,
                        _ => PrintDirection::BottomToTop,
                    };
                    self.windows[idx].attrs.print_direction = print_direction;
                }
                (4, false)
            }
            0x98..=0x9F => {
                let n = (c - 0x98) as usize;
                let b = rest;
                let priority = b.first().copied().unwrap_or(0) & 0x07;
                let anchor_point = b.get(1).map(|v| (v >> 4) & 0x0F).unwrap_or(0);
                let anchor_vertical = b.get(1).map(|v| v & 0x0F).unwrap_or(0) as u8 * 5;
                let anchor_horizontal = b.get(2).copied().unwrap_or(0);
                let row_count = b.get(3).map(|v| (v & 0x0F) + 1).unwrap_or(1);
                let col_count = b.get(4).map(|v| (v & 0x3F) + 1).unwrap_or(32);

                let attrs = WindowAttrs {
                    priority,
                    anchor_point,
                    anchor_vertical,
                    anchor_horizontal,
                    row_count,
                    col_count,
                    print_direction: PrintDirection::LeftToRight,
                };
                let already_defined = self.windows[n].defined
                    && self.windows[n].attrs.row_count == attrs.row_count
                    && self.windows[n].attrs.col_count == attrs.col_count;
                if !already_defined {
                    self.windows[n].define(attrs);
                }
                self.current_window = Some(n);
                (6, false)
            }
            // 0x90..=0x9F variable-length extended commands beyond SPA
            // (0x90) are not in this C1 table per the 708 spec; the
            // genuinely unsupported variable-length C3 range (0x90..0x9F
            // under EXT1) is handled in decode_ext1's fallback, not here.
            _ => (0, false),
        }
    }

    fn write_g0(&mut self, ch: char) {
        if let Some(idx) = self.current_window {
            let ch = if ch == '\u{7F}' { '♪' } else { ch };
            self.windows[idx].write_char(ch);
        }
    }

    /// Aborts decoding of the remainder of the current service block,
    /// called when a C3 extended code in `0x90..=0x9F` (unsupported,
    /// variable length) is encountered. Scoped to this block only: the
    /// decoder's windows and state survive into the next block.
    pub fn abort_current_block(&mut self) {
        self.aborted_block = true;
    }
}

impl Default for Cea708ServiceDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_window_and_writes_text() {
        let mut svc = Cea708ServiceDecoder::new();
        // DF0 with minimal attribute bytes, then select it implicitly.
        svc.decode_block(&[0x98, 0x00, 0x00, 0x00, 0x00, 0x00]);
        svc.decode_block(&[b'H', b'I']);
        let win = svc.current_window.unwrap();
        assert_eq!(svc.windows[win].grid[0][0], Some('H'));
    }

    #[test]
    fn cw_switches_only_to_defined_window() {
        let mut svc = Cea708ServiceDecoder::new();
        svc.decode_block(&[0x81]); // CW1, window 1 not defined yet
        assert!(svc.current_window.is_none());
    }

    #[test]
    fn rst_returns_every_window_to_init_state() {
        let mut svc = Cea708ServiceDecoder::new();
        svc.decode_block(&[0x98, 0x00, 0x00, 0x00, 0x00, 0x00]); // DF0
        svc.decode_block(&[b'H', b'I']);
        assert!(svc.windows[0].defined);
        assert!(svc.current_window.is_some());

        svc.decode_block(&[0x8F]); // RST

        let fresh = Cea708ServiceDecoder::new();
        assert!(svc.current_window.is_none());
        for (reset, init) in svc.windows.iter().zip(fresh.windows.iter()) {
            assert_eq!(reset.defined, init.defined);
            assert_eq!(reset.visible, init.visible);
            assert_eq!(reset.grid, init.grid);
        }
    }

    #[test]
    fn abort_stops_remaining_bytes_in_block() {
        let mut svc = Cea708ServiceDecoder::new();
        svc.decode_block(&[0x98, 0x00, 0x00, 0x00, 0x00, 0x00]);
        svc.abort_current_block();
        let before = svc.windows[0].grid[0][0];
        svc.decode_block(&[b'X']);
        // abort flag only affects the block it was raised in; this is a
        // fresh decode_block call so it proceeds normally.
        assert_ne!(svc.windows[0].grid[0][0], before);
    }
}

//! Preamble Address Code table: maps the `(b1, b2)` pair carrying a PAC
//! to the row/colour/font/indent it sets, per CEA-608 Table 9/10.

use super::grid::{Cea608Color, FontAttr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacResult {
    pub row: u8,
    pub color: Cea608Color,
    pub font: FontAttr,
    pub indent: u8,
}

/// `b1` is one of `0x10..=0x17` (channel 1/2) or `0x18..=0x1F` (channel
/// 3/4); the row only depends on the low 3 bits of `b1` and the high bit
/// of `b2`, indexed as `rowdata[((b1 & 0x07) << 1) | ((b2 >> 5) & 0x01)]`.
const ROWDATA: [u8; 16] = [11, 11, 1, 2, 3, 4, 12, 13, 14, 15, 5, 6, 7, 8, 9, 10];

pub fn decode_pac(b1: u8, b2: u8) -> Option<PacResult> {
    if !(0x10..=0x1F).contains(&b1) || !(0x40..=0x7F).contains(&b2) {
        return None;
    }

    let index = (((b1 & 0x07) << 1) | ((b2 >> 5) & 0x01)) as usize;
    let row = ROWDATA[index];

    let field = b2 & 0x1F;
    // Low 5 bits of b2 select: 0x00..0x0F = colour + indent-0, with
    // attribute style depending on value; 0x10..0x1D = indent steps of
    // 4; the underline bit is the low bit throughout.
    let underline = field & 0x01 != 0;
    // 0x0E/0x0F (italics/underlined italics) share the colour+indent-0
    // shape of 0x00..=0x0D, not the indent-step shape of 0x10..=0x1D;
    // handling them here (rather than falling into the `field - 0x10`
    // branch) avoids underflowing that subtraction.
    let (color, indent) = if field <= 0x0F {
        let color_index = field >> 1;
        let color = match color_index {
            0 => Cea608Color::White,
            1 => Cea608Color::Green,
            2 => Cea608Color::Blue,
            3 => Cea608Color::Cyan,
            4 => Cea608Color::Red,
            5 => Cea608Color::Yellow,
            6 => Cea608Color::Magenta,
            _ => Cea608Color::White, // 7 (0x0E/0x0F): italics, forced white below.
        };
        (color, 0)
    } else {
        let indent_step = (field - 0x10) >> 1;
        (Cea608Color::White, indent_step * 4)
    };

    let italics = field == 0x0E || field == 0x0F;

    Some(PacResult {
        row,
        color: if italics { Cea608Color::White } else { color },
        font: FontAttr { italics, underline },
        indent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row15_white_no_indent() {
        let result = decode_pac(0x14, 0x60).unwrap();
        assert_eq!(result.row, 15);
        assert_eq!(result.indent, 0);
    }

    #[test]
    fn row11_from_either_b2_half() {
        assert_eq!(decode_pac(0x10, 0x40).unwrap().row, 11);
        assert_eq!(decode_pac(0x10, 0x60).unwrap().row, 11);
    }

    #[test]
    fn out_of_range_bytes_return_none() {
        assert!(decode_pac(0x09, 0x40).is_none());
        assert!(decode_pac(0x13, 0x10).is_none());
    }

    #[test]
    fn italics_codes_do_not_underflow_indent() {
        for b2 in [0x4E, 0x4F, 0x6E, 0x6F] {
            let result = decode_pac(0x11, b2).unwrap();
            assert_eq!(result.indent, 0);
            assert!(result.font.italics);
            assert_eq!(result.color, Cea608Color::White);
        }
        assert!(!decode_pac(0x11, 0x4E).unwrap().font.underline);
        assert!(decode_pac(0x11, 0x4F).unwrap().font.underline);
    }
}

//! One DTVCC window: its defining attributes and its own text grid.

/// Print/scroll direction, set by SWA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenAttr {
    pub italics: bool,
    pub underline: bool,
}

impl Default for PenAttr {
    fn default() -> Self {
        Self {
            italics: false,
            underline: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenColor {
    pub fg: u8,
    pub bg: u8,
    pub edge: u8,
}

/// One window's definable attributes, set by `DFx` and refined by `SWA`.
#[derive(Debug, Clone, Copy)]
pub struct WindowAttrs {
    pub priority: u8,
    pub anchor_point: u8,
    pub anchor_vertical: u8,
    pub anchor_horizontal: u8,
    pub row_count: u8,
    pub col_count: u8,
    pub print_direction: PrintDirection,
}

impl Default for WindowAttrs {
    fn default() -> Self {
        Self {
            priority: 0,
            anchor_point: 0,
            anchor_vertical: 0,
            anchor_horizontal: 0,
            row_count: 1,
            col_count: 32,
            print_direction: PrintDirection::LeftToRight,
        }
    }
}

/// A DTVCC window: its own small text grid plus the attributes and
/// visibility state needed to composite it onto the TV grid.
pub struct Cea708Window {
    pub defined: bool,
    pub visible: bool,
    pub attrs: WindowAttrs,
    pub grid: Vec<Vec<Option<char>>>,
    pub pen_row: usize,
    pub pen_col: usize,
    pub pen_attr: PenAttr,
    pub pen_color: PenColor,
}

impl Cea708Window {
    pub fn new() -> Self {
        Self {
            defined: false,
            visible: false,
            attrs: WindowAttrs::default(),
            grid: vec![vec![None; 32]; 1],
            pen_row: 0,
            pen_col: 0,
            pen_attr: PenAttr::default(),
            pen_color: PenColor::default(),
        }
    }

    pub fn define(&mut self, attrs: WindowAttrs) {
        self.attrs = attrs;
        self.grid = vec![vec![None; attrs.col_count as usize]; attrs.row_count as usize];
        self.pen_row = 0;
        self.pen_col = 0;
        self.defined = true;
    }

    pub fn is_empty(&self) -> bool {
        self.grid.iter().all(|row| row.iter().all(|c| c.is_none()))
    }

    pub fn write_char(&mut self, ch: char) {
        if let Some(row) = self.grid.get_mut(self.pen_row) {
            if let Some(cell) = row.get_mut(self.pen_col) {
                *cell = Some(ch);
            }
        }
        self.advance_pen();
    }

    fn advance_pen(&mut self) {
        let rows = self.grid.len();
        let cols = self.attrs.col_count as usize;
        match self.attrs.print_direction {
            PrintDirection::LeftToRight => {
                if self.pen_col + 1 < cols {
                    self.pen_col += 1;
                }
            }
            PrintDirection::RightToLeft => {
                self.pen_col = self.pen_col.saturating_sub(1);
            }
            PrintDirection::TopToBottom => {
                if self.pen_row + 1 < rows {
                    self.pen_row += 1;
                }
            }
            PrintDirection::BottomToTop => {
                self.pen_row = self.pen_row.saturating_sub(1);
            }
        }
    }

    pub fn carriage_return(&mut self) {
        match self.attrs.print_direction {
            PrintDirection::LeftToRight | PrintDirection::RightToLeft => {
                if self.pen_row + 1 < self.grid.len() {
                    self.pen_row += 1;
                }
                self.pen_col = 0;
            }
            PrintDirection::TopToBottom | PrintDirection::BottomToTop => {
                self.pen_col = 0;
                self.pen_row = 0;
            }
        }
    }

    pub fn form_feed(&mut self) {
        for row in &mut self.grid {
            row.fill(None);
        }
        self.pen_row = 0;
        self.pen_col = 0;
    }

    /// Anchor resolution: returns `(top, left)` on the 75×210 TV grid.
    pub fn anchor_top_left(&self) -> (usize, usize) {
        let row_count = self.attrs.row_count as usize;
        let col_count = self.attrs.col_count as usize;
        let av = self.attrs.anchor_vertical as usize;
        let ah = self.attrs.anchor_horizontal as usize;

        let (top_delta, left_delta) = match self.attrs.anchor_point {
            0 => (0, 0),
            1 => (0, col_count / 2),
            2 => (0, col_count),
            3 => (row_count / 2, 0),
            4 => (row_count / 2, col_count / 2),
            5 => (row_count / 2, col_count),
            6 => (row_count, 0),
            7 => (row_count, col_count / 2),
            8 => (row_count, col_count),
            _ => (0, 0),
        };
        let top = av.saturating_sub(top_delta).min(75usize.saturating_sub(1));
        let left = ah.saturating_sub(left_delta).min(210usize.saturating_sub(1));
        (top, left)
    }
}

impl Default for Cea708Window {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_resets_grid_to_requested_size() {
        let mut w = Cea708Window::new();
        w.define(WindowAttrs {
            row_count: 3,
            col_count: 10,
            ..Default::default()
        });
        assert_eq!(w.grid.len(), 3);
        assert_eq!(w.grid[0].len(), 10);
    }

    #[test]
    fn write_char_advances_pen_left_to_right() {
        let mut w = Cea708Window::new();
        w.define(WindowAttrs {
            row_count: 1,
            col_count: 5,
            ..Default::default()
        });
        w.write_char('A');
        w.write_char('B');
        assert_eq!(w.grid[0][0], Some('A'));
        assert_eq!(w.grid[0][1], Some('B'));
    }

    #[test]
    fn anchor_top_left_centers_on_anchor_point_4() {
        let mut w = Cea708Window::new();
        w.define(WindowAttrs {
            row_count: 4,
            col_count: 20,
            anchor_point: 4,
            anchor_vertical: 10,
            anchor_horizontal: 50,
            ..Default::default()
        });
        assert_eq!(w.anchor_top_left(), (8, 40));
    }
}

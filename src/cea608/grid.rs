//! The 15×32 CEA-608 character grid and its per-cell attributes.

/// Text colour as carried by PAC and mid-row codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cea608Color {
    #[default]
    White,
    Green,
    Blue,
    Cyan,
    Red,
    Yellow,
    Magenta,
}

/// Font style bits carried alongside colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontAttr {
    pub italics: bool,
    pub underline: bool,
}

/// One grid cell: a character plus the attributes in effect when it was
/// written. Transparent (never-written) cells are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    pub ch: char,
    pub color: Cea608Color,
    pub font: FontAttr,
}

const ROWS: usize = 15;
const COLS: usize = 32;

/// One of the two 608 memories (displayed / non-displayed), a fixed
/// 15×32 grid of optional cells.
#[derive(Debug, Clone)]
pub struct Cea608Grid {
    cells: Vec<Vec<Option<Cell>>>,
}

impl Default for Cea608Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Cea608Grid {
    pub fn new() -> Self {
        Self {
            cells: vec![vec![None; COLS]; ROWS],
        }
    }

    pub fn rows(&self) -> usize {
        ROWS
    }

    pub fn cols(&self) -> usize {
        COLS
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if row < ROWS && col < COLS {
            self.cells[row][col] = Some(cell);
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(None);
        }
    }

    /// Clears a single row (used for roll-up mode's below-PAC wipe and
    /// `DeleteToEndOfRow`).
    pub fn clear_row(&mut self, row: usize) {
        if let Some(r) = self.cells.get_mut(row) {
            r.fill(None);
        }
    }

    pub fn clear_row_from(&mut self, row: usize, from_col: usize) {
        if let Some(r) = self.cells.get_mut(row) {
            for cell in r.iter_mut().skip(from_col) {
                *cell = None;
            }
        }
    }

    /// Shifts every row up by one, discarding row 0 and leaving the
    /// bottommost row of the roll-up window blank. `base_row` is the
    /// last (bottommost) row of the active roll-up window.
    pub fn scroll_up(&mut self, base_row: usize, window_size: usize) {
        let top = base_row.saturating_sub(window_size.saturating_sub(1));
        for row in top..base_row {
            self.cells[row] = self.cells[row + 1].clone();
        }
        self.clear_row(base_row);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|r| r.iter().all(|c| c.is_none()))
    }

    /// Renders non-empty rows to plain text lines, in row order, for
    /// transcript-style or debug output.
    pub fn to_lines(&self) -> Vec<String> {
        self.cells
            .iter()
            .filter(|row| row.iter().any(|c| c.is_some()))
            .map(|row| {
                row.iter()
                    .map(|c| c.map(|cell| cell.ch).unwrap_or(' '))
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    /// Renders non-empty rows as full 32-cell attribute runs, for
    /// encoders that need to emit `<font color>`/`<i>`/`<u>` spans.
    /// Blank cells carry `Cell::default()` (white, no font).
    pub fn to_rich_lines(&self) -> Vec<Vec<Cell>> {
        self.cells
            .iter()
            .filter(|row| row.iter().any(|c| c.is_some()))
            .map(|row| row.iter().map(|c| c.unwrap_or_default()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut g = Cea608Grid::new();
        g.set(0, 0, Cell { ch: 'H', ..Default::default() });
        assert_eq!(g.get(0, 0).unwrap().ch, 'H');
    }

    #[test]
    fn scroll_up_shifts_rows_and_blanks_base() {
        let mut g = Cea608Grid::new();
        g.set(14, 0, Cell { ch: 'A', ..Default::default() });
        g.scroll_up(14, 2);
        assert_eq!(g.get(13, 0).unwrap().ch, 'A');
        assert!(g.get(14, 0).is_none());
    }

    #[test]
    fn to_lines_skips_blank_rows() {
        let mut g = Cea608Grid::new();
        g.set(5, 0, Cell { ch: 'X', ..Default::default() });
        assert_eq!(g.to_lines(), vec!["X".to_string()]);
    }
}

//! Board model: records claimed cells and detects a winner.

use log::warn;
use shared::{BOARD_HEIGHT, BOARD_WIDTH};

/// Fixed 3x3 grid of cell owners.
///
/// A cell holds `0` while empty and the owning player's symbol once claimed.
/// The win rule is only defined for three-in-a-line on a 3x3 grid, so the
/// dimensions are fixed at construction.
#[derive(Debug, Clone)]
pub struct Board {
    width: u8,
    height: u8,
    cells: Vec<u8>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            cells: vec![0; BOARD_WIDTH as usize * BOARD_HEIGHT as usize],
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Returns true when (x, y) lies on the grid.
    pub fn in_bounds(&self, x: u8, y: u8) -> bool {
        x < self.width && y < self.height
    }

    /// Records that cell (x, y) is owned by `symbol`.
    ///
    /// Returns false and leaves the grid untouched for out-of-range
    /// coordinates or an empty symbol.
    pub fn set_field(&mut self, symbol: u8, x: u8, y: u8) -> bool {
        if symbol == 0 || !self.in_bounds(x, y) {
            warn!("Rejected field set: symbol {} at ({}, {})", symbol, x, y);
            return false;
        }
        self.cells[y as usize * self.width as usize + x as usize] = symbol;
        true
    }

    /// Reads the owner of cell (x, y); `None` when out of range.
    pub fn get(&self, x: u8, y: u8) -> Option<u8> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.cells[y as usize * self.width as usize + x as usize])
    }

    /// Returns the symbol holding a full row, column, or diagonal, or 0.
    pub fn who_won(&self) -> u8 {
        let cell = |x: u8, y: u8| self.cells[y as usize * self.width as usize + x as usize];

        for y in 0..self.height {
            let first = cell(0, y);
            if first != 0 && first == cell(1, y) && first == cell(2, y) {
                return first;
            }
        }
        for x in 0..self.width {
            let first = cell(x, 0);
            if first != 0 && first == cell(x, 1) && first == cell(x, 2) {
                return first;
            }
        }
        let center = cell(1, 1);
        if center != 0 {
            if cell(0, 0) == center && cell(2, 2) == center {
                return center;
            }
            if cell(2, 0) == center && cell(0, 2) == center {
                return center;
            }
        }
        0
    }

    /// Resets every cell to 0 for the next match.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

//! Connect-4 on the standard 6x7 board.
//!
//! The action space is the column index. Used as the engine's reference
//! game: small enough for exhaustive tests, large enough that search
//! quality is observable.

use alphazero_core::{AlphaZeroError, GameState, PlayHistory, Result};
use ndarray::{Array3, Axis};
use std::fmt;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

const EMPTY: u8 = 0;

/// Connect-4 position. Row 0 is the bottom of the board; cell values are
/// `player + 1`, zero for empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connect4 {
    cells: [u8; ROWS * COLS],
    turn: u32,
}

impl Connect4 {
    pub fn new() -> Self {
        Self {
            cells: [EMPTY; ROWS * COLS],
            turn: 0,
        }
    }

    fn at(&self, row: usize, col: usize) -> u8 {
        self.cells[row * COLS + col]
    }

    /// Winning piece value (1 or 2), if four-in-a-row exists anywhere.
    fn winner(&self) -> Option<u8> {
        // Right, up, up-right, up-left.
        const DIRS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        for row in 0..ROWS {
            for col in 0..COLS {
                let piece = self.at(row, col);
                if piece == EMPTY {
                    continue;
                }
                for (dr, dc) in DIRS {
                    let end_r = row as isize + 3 * dr;
                    let end_c = col as isize + 3 * dc;
                    if end_r >= ROWS as isize || end_c < 0 || end_c >= COLS as isize {
                        continue;
                    }
                    if (1..4).all(|k| {
                        self.at(
                            (row as isize + k * dr) as usize,
                            (col as isize + k * dc) as usize,
                        ) == piece
                    }) {
                        return Some(piece);
                    }
                }
            }
        }
        None
    }
}

impl Default for Connect4 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Connect4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Turn {}:", self.turn)?;
        for row in (0..ROWS).rev() {
            for col in 0..COLS {
                let glyph = match self.at(row, col) {
                    1 => 'X',
                    2 => 'O',
                    _ => '.',
                };
                write!(f, "{} ", glyph)?;
            }
            writeln!(f)?;
        }
        write!(f, "0 1 2 3 4 5 6")
    }
}

impl GameState for Connect4 {
    fn current_player(&self) -> usize {
        (self.turn % 2) as usize
    }

    fn current_turn(&self) -> u32 {
        self.turn
    }

    fn num_players(&self) -> usize {
        2
    }

    fn num_moves(&self) -> usize {
        COLS
    }

    fn valid_moves(&self) -> Vec<bool> {
        (0..COLS)
            .map(|col| self.at(ROWS - 1, col) == EMPTY)
            .collect()
    }

    fn play_move(&mut self, action: usize) -> Result<()> {
        if action >= COLS {
            return Err(AlphaZeroError::InvalidMove(action));
        }
        let row = (0..ROWS)
            .find(|&row| self.at(row, action) == EMPTY)
            .ok_or(AlphaZeroError::InvalidMove(action))?;

        self.cells[row * COLS + action] = self.current_player() as u8 + 1;
        self.turn += 1;
        Ok(())
    }

    fn scores(&self) -> Option<Vec<f32>> {
        if let Some(piece) = self.winner() {
            let mut scores = vec![0.0; 3];
            scores[piece as usize - 1] = 1.0;
            return Some(scores);
        }
        if self.turn as usize == ROWS * COLS {
            return Some(vec![0.0, 0.0, 1.0]);
        }
        None
    }

    fn canonicalized(&self) -> Array3<f32> {
        let me = self.current_player() as u8 + 1;
        let mut out = Array3::zeros((2, ROWS, COLS));
        for row in 0..ROWS {
            for col in 0..COLS {
                let piece = self.at(row, col);
                if piece != EMPTY {
                    let plane = if piece == me { 0 } else { 1 };
                    out[[plane, row, col]] = 1.0;
                }
            }
        }
        out
    }

    fn num_symmetries(&self) -> usize {
        2
    }

    /// Identity plus the horizontal mirror: board columns reverse, and
    /// each policy probability remaps to the mirrored column.
    fn symmetries(&self, base: &PlayHistory) -> Vec<PlayHistory> {
        let mut canonical = base.canonical.clone();
        canonical.invert_axis(Axis(2));
        let canonical = canonical.as_standard_layout().to_owned();

        let mut pi = vec![0.0; base.pi.len()];
        for (col, &p) in base.pi.iter().enumerate() {
            pi[COLS - 1 - col] = p;
        }

        vec![base.clone(), PlayHistory::new(canonical, pi, base.v)]
    }
}

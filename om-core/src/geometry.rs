//! Board geometry shared by producers and the replay pipeline.
//!
//! Occupancy is carried in a `u64` bitmask, so a board has at most 64 cells.
//! The action space starts with one slot per cell (row-major); any slots
//! beyond `board_size²` are non-spatial (e.g. pass) and never move under a
//! board symmetry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BOARD_SIZE: usize = 8;
pub const DEFAULT_N_ACTIONS: usize = 64;

/// Largest board whose occupancy fits in a `u64`.
pub const MAX_BOARD_SIZE: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("board_size must be in 1..={max}, got {got}")]
    BoardSize { got: usize, max: usize },
    #[error("n_actions ({n_actions}) must be >= board_size² ({cells})")]
    TooFewActions { n_actions: usize, cells: usize },
    #[error("n_actions ({0}) does not fit the u8 action field")]
    TooManyActions(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGeometry {
    pub board_size: usize,
    pub n_actions: usize,
}

impl BoardGeometry {
    pub fn new(board_size: usize, n_actions: usize) -> Result<Self, GeometryError> {
        let g = Self {
            board_size,
            n_actions,
        };
        g.check()?;
        Ok(g)
    }

    /// Validate a geometry that was built field-by-field (e.g. from YAML).
    pub fn check(&self) -> Result<(), GeometryError> {
        if self.board_size == 0 || self.board_size > MAX_BOARD_SIZE {
            return Err(GeometryError::BoardSize {
                got: self.board_size,
                max: MAX_BOARD_SIZE,
            });
        }
        if self.n_actions < self.cells() {
            return Err(GeometryError::TooFewActions {
                n_actions: self.n_actions,
                cells: self.cells(),
            });
        }
        if self.n_actions > 256 {
            return Err(GeometryError::TooManyActions(self.n_actions));
        }
        Ok(())
    }

    /// Number of board cells (`board_size²`).
    pub fn cells(&self) -> usize {
        self.board_size * self.board_size
    }

    /// Action slots past the board cells.
    pub fn extra_actions(&self) -> usize {
        self.n_actions - self.cells()
    }

    /// Mask with one bit per board cell.
    pub fn occupancy_mask(&self) -> u64 {
        let cells = self.cells();
        if cells >= 64 {
            u64::MAX
        } else {
            (1u64 << cells) - 1
        }
    }
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            n_actions: DEFAULT_N_ACTIONS,
        }
    }
}

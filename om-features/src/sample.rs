//! Training samples and the per-generation sample arena.

use om_core::BoardGeometry;
use thiserror::Error;

use crate::board::{decode_board, Plane};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("tensor {name}: got {got} values, expected {expected}")]
    Len {
        name: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("sample does not match geometry {board_size}x{board_size}/{n_actions}")]
    Geometry { board_size: usize, n_actions: usize },
}

/// One training sample.
///
/// `side` is 0 when black is to move and 1 when white is.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub black: Plane,
    pub white: Plane,
    pub side: u8,
    pub legal_mask: Vec<f32>,
    pub policy: Vec<f32>,
    pub value: f32,
}

impl Sample {
    /// Build a sample from raw record fields.
    pub fn from_record_parts(
        geometry: &BoardGeometry,
        black_occupancy: u64,
        white_occupancy: u64,
        side: u8,
        legal_flags: &[bool],
        posteriors: &[f32],
        value: f32,
    ) -> Self {
        Self {
            black: decode_board(black_occupancy, geometry.board_size),
            white: decode_board(white_occupancy, geometry.board_size),
            side,
            legal_mask: legal_flags
                .iter()
                .map(|&b| if b { 1.0 } else { 0.0 })
                .collect(),
            policy: posteriors.to_vec(),
            value,
        }
    }

    pub fn matches(&self, geometry: &BoardGeometry) -> bool {
        self.black.size() == geometry.board_size
            && self.white.size() == geometry.board_size
            && self.legal_mask.len() == geometry.n_actions
            && self.policy.len() == geometry.n_actions
    }
}

/// Struct-of-arrays storage for one generation's samples.
///
/// Every tensor is allocated once for the final sample count; rows are
/// fixed-width (`cells` for planes, `n_actions` for action vectors).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    geometry: BoardGeometry,
    len: usize,
    black: Vec<f32>,
    white: Vec<f32>,
    side: Vec<f32>,
    legal_mask: Vec<f32>,
    policy: Vec<f32>,
    value: Vec<f32>,
}

/// Borrowed row of a [`SampleSet`].
#[derive(Debug, Clone, Copy)]
pub struct SampleRow<'a> {
    pub black: &'a [f32],
    pub white: &'a [f32],
    pub side: f32,
    pub legal_mask: &'a [f32],
    pub policy: &'a [f32],
    pub value: f32,
}

/// Raw tensors of a [`SampleSet`], in row-major order.
#[derive(Debug, Clone, Default)]
pub struct SampleTensors {
    pub black: Vec<f32>,
    pub white: Vec<f32>,
    pub side: Vec<f32>,
    pub legal_mask: Vec<f32>,
    pub policy: Vec<f32>,
    pub value: Vec<f32>,
}

impl SampleSet {
    pub fn with_capacity(geometry: BoardGeometry, n: usize) -> Self {
        let cells = geometry.cells();
        let a = geometry.n_actions;
        Self {
            geometry,
            len: 0,
            black: Vec::with_capacity(n * cells),
            white: Vec::with_capacity(n * cells),
            side: Vec::with_capacity(n),
            legal_mask: Vec::with_capacity(n * a),
            policy: Vec::with_capacity(n * a),
            value: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, s: &Sample) -> Result<(), ShapeError> {
        if !s.matches(&self.geometry) {
            return Err(ShapeError::Geometry {
                board_size: self.geometry.board_size,
                n_actions: self.geometry.n_actions,
            });
        }
        self.black.extend_from_slice(s.black.as_slice());
        self.white.extend_from_slice(s.white.as_slice());
        self.side.push(s.side as f32);
        self.legal_mask.extend_from_slice(&s.legal_mask);
        self.policy.extend_from_slice(&s.policy);
        self.value.push(s.value);
        self.len += 1;
        Ok(())
    }

    /// Rebuild from raw tensors (e.g. a cache file), checking every length.
    pub fn from_tensors(geometry: BoardGeometry, t: SampleTensors) -> Result<Self, ShapeError> {
        let n = t.value.len();
        let cells = geometry.cells();
        let a = geometry.n_actions;
        check_len("black", t.black.len(), n * cells)?;
        check_len("white", t.white.len(), n * cells)?;
        check_len("side", t.side.len(), n)?;
        check_len("legal_mask", t.legal_mask.len(), n * a)?;
        check_len("policy", t.policy.len(), n * a)?;
        Ok(Self {
            geometry,
            len: n,
            black: t.black,
            white: t.white,
            side: t.side,
            legal_mask: t.legal_mask,
            policy: t.policy,
            value: t.value,
        })
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn row(&self, i: usize) -> SampleRow<'_> {
        let cells = self.geometry.cells();
        let a = self.geometry.n_actions;
        SampleRow {
            black: &self.black[i * cells..(i + 1) * cells],
            white: &self.white[i * cells..(i + 1) * cells],
            side: self.side[i],
            legal_mask: &self.legal_mask[i * a..(i + 1) * a],
            policy: &self.policy[i * a..(i + 1) * a],
            value: self.value[i],
        }
    }

    /// Owned copy of row `i`.
    pub fn get(&self, i: usize) -> Sample {
        let r = self.row(i);
        let n = self.geometry.board_size;
        Sample {
            black: Plane::from_cells(n, r.black.to_vec()),
            white: Plane::from_cells(n, r.white.to_vec()),
            side: if r.side != 0.0 { 1 } else { 0 },
            legal_mask: r.legal_mask.to_vec(),
            policy: r.policy.to_vec(),
            value: r.value,
        }
    }

    pub fn tensors(&self) -> SampleTensorsRef<'_> {
        SampleTensorsRef {
            black: &self.black,
            white: &self.white,
            side: &self.side,
            legal_mask: &self.legal_mask,
            policy: &self.policy,
            value: &self.value,
        }
    }
}

/// Borrowed view of all tensors of a [`SampleSet`].
#[derive(Debug, Clone, Copy)]
pub struct SampleTensorsRef<'a> {
    pub black: &'a [f32],
    pub white: &'a [f32],
    pub side: &'a [f32],
    pub legal_mask: &'a [f32],
    pub policy: &'a [f32],
    pub value: &'a [f32],
}

fn check_len(name: &'static str, got: usize, expected: usize) -> Result<(), ShapeError> {
    if got != expected {
        return Err(ShapeError::Len {
            name,
            got,
            expected,
        });
    }
    Ok(())
}

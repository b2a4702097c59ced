//! Fixed-width binary game records.
//!
//! One record per decision, little-endian and byte-packed:
//!
//! | offset        | size          | field                         |
//! |---------------|---------------|-------------------------------|
//! | 0             | 8             | black occupancy (`u64`)       |
//! | 8             | 8             | white occupancy (`u64`)       |
//! | 16            | 1             | side to move (0 black/1 white)|
//! | 17            | 1             | action taken (`u8`)           |
//! | 18            | 4             | search value `Q` (`f32`)      |
//! | 22            | 4             | game result (`f32`)           |
//! | 26            | `n`           | legal flags (0/1 bytes)       |
//! | 26 + `n`      | `4n`          | posteriors (`f32`)            |
//!
//! Bit `i` of an occupancy mask is cell `(i / board_size, i % board_size)`.

use om_core::BoardGeometry;
use om_features::Sample;
use thiserror::Error;

/// Bytes before the per-action arrays.
pub const RECORD_HEADER_LEN: usize = 26;

/// Allowed drift of the legal-posterior sum away from 1.
pub const POSTERIOR_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("{len} bytes is not a multiple of the record width {width}")]
    Length { len: usize, width: usize },
    #[error("record {index}: side byte {value} is not 0 or 1")]
    Side { index: usize, value: u8 },
    #[error("record {index}: legal flag for action {action} is {value}, not 0 or 1")]
    LegalFlag {
        index: usize,
        action: usize,
        value: u8,
    },
    #[error("record carries {got} action slots, layout expects {expected}")]
    ActionCount { got: usize, expected: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("black and white occupy the same cells ({0:#018x})")]
    Overlap(u64),
    #[error("occupancy outside the board ({0:#018x})")]
    OffBoard(u64),
    #[error("{field} is not finite")]
    NonFinite { field: &'static str },
    #[error("result {0} outside [-1, 1]")]
    ResultRange(f32),
    #[error("posterior {value} at action {action} is negative")]
    NegativePosterior { action: usize, value: f32 },
    #[error("posterior mass {mass} on illegal action {action}")]
    IllegalMass { action: usize, mass: f32 },
    #[error("legal posteriors sum to {0}")]
    PosteriorSum(f32),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("record {index}: {violation}")]
    Invariant {
        index: usize,
        violation: InvariantViolation,
    },
}

/// One self-play decision as written by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub black_occupancy: u64,
    pub white_occupancy: u64,
    pub side: u8,
    pub action: u8,
    pub q: f32,
    pub result: f32,
    pub legal_flags: Vec<bool>,
    pub posteriors: Vec<f32>,
}

impl GameRecord {
    /// `result·(1−q_frac) + Q·q_frac`.
    pub fn value_target(&self, q_frac: f32) -> f32 {
        self.result * (1.0 - q_frac) + self.q * q_frac
    }

    pub fn to_sample(&self, geometry: &BoardGeometry, q_frac: f32) -> Sample {
        Sample::from_record_parts(
            geometry,
            self.black_occupancy,
            self.white_occupancy,
            self.side,
            &self.legal_flags,
            &self.posteriors,
            self.value_target(q_frac),
        )
    }

    /// Semantic checks on an already well-formed record.
    pub fn check_invariants(&self, geometry: &BoardGeometry) -> Result<(), InvariantViolation> {
        let overlap = self.black_occupancy & self.white_occupancy;
        if overlap != 0 {
            return Err(InvariantViolation::Overlap(overlap));
        }
        let off = (self.black_occupancy | self.white_occupancy) & !geometry.occupancy_mask();
        if off != 0 {
            return Err(InvariantViolation::OffBoard(off));
        }
        if !self.q.is_finite() {
            return Err(InvariantViolation::NonFinite { field: "q" });
        }
        if !self.result.is_finite() {
            return Err(InvariantViolation::NonFinite { field: "result" });
        }
        if !(-1.0..=1.0).contains(&self.result) {
            return Err(InvariantViolation::ResultRange(self.result));
        }

        let mut sum = 0.0f64;
        for (action, (&legal, &p)) in self.legal_flags.iter().zip(&self.posteriors).enumerate() {
            if !p.is_finite() {
                return Err(InvariantViolation::NonFinite { field: "posterior" });
            }
            if p < 0.0 {
                return Err(InvariantViolation::NegativePosterior { action, value: p });
            }
            if legal {
                sum += p as f64;
            } else if p != 0.0 {
                return Err(InvariantViolation::IllegalMass { action, mass: p });
            }
        }
        let sum = sum as f32;
        if (sum - 1.0).abs() > POSTERIOR_SUM_TOLERANCE {
            return Err(InvariantViolation::PosteriorSum(sum));
        }
        Ok(())
    }
}

/// Byte layout of a record for one board geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    geometry: BoardGeometry,
}

impl RecordLayout {
    pub fn new(geometry: BoardGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn n_actions(&self) -> usize {
        self.geometry.n_actions
    }

    /// `26 + 5·n_actions` bytes.
    pub fn record_width(&self) -> usize {
        RECORD_HEADER_LEN + 5 * self.geometry.n_actions
    }

    /// Number of whole records in `len` bytes, or a [`FormatError::Length`].
    pub fn record_count(&self, len: usize) -> Result<usize, FormatError> {
        let width = self.record_width();
        if len % width != 0 {
            return Err(FormatError::Length { len, width });
        }
        Ok(len / width)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>, r: &GameRecord) -> Result<(), FormatError> {
        let n = self.n_actions();
        for got in [r.legal_flags.len(), r.posteriors.len()] {
            if got != n {
                return Err(FormatError::ActionCount { got, expected: n });
            }
        }
        out.reserve(self.record_width());
        out.extend_from_slice(&r.black_occupancy.to_le_bytes());
        out.extend_from_slice(&r.white_occupancy.to_le_bytes());
        out.push(r.side);
        out.push(r.action);
        out.extend_from_slice(&r.q.to_le_bytes());
        out.extend_from_slice(&r.result.to_le_bytes());
        out.extend(r.legal_flags.iter().map(|&b| b as u8));
        for p in &r.posteriors {
            out.extend_from_slice(&p.to_le_bytes());
        }
        Ok(())
    }

    pub fn encode(&self, records: &[GameRecord]) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(records.len() * self.record_width());
        for r in records {
            self.encode_into(&mut out, r)?;
        }
        Ok(out)
    }

    /// Parse one record of exactly `record_width()` bytes. No invariant checks.
    ///
    /// `index` only labels errors.
    pub fn decode_one(&self, index: usize, bytes: &[u8]) -> Result<GameRecord, FormatError> {
        let width = self.record_width();
        if bytes.len() != width {
            return Err(FormatError::Length {
                len: bytes.len(),
                width,
            });
        }
        let n = self.n_actions();
        let mut c = Cursor::new(bytes);
        let black_occupancy = c.u64();
        let white_occupancy = c.u64();
        let side = c.u8();
        if side > 1 {
            return Err(FormatError::Side { index, value: side });
        }
        let action = c.u8();
        let q = c.f32();
        let result = c.f32();
        let mut legal_flags = Vec::with_capacity(n);
        for action in 0..n {
            match c.u8() {
                0 => legal_flags.push(false),
                1 => legal_flags.push(true),
                value => {
                    return Err(FormatError::LegalFlag {
                        index,
                        action,
                        value,
                    })
                }
            }
        }
        let posteriors = (0..n).map(|_| c.f32()).collect();
        Ok(GameRecord {
            black_occupancy,
            white_occupancy,
            side,
            action,
            q,
            result,
            legal_flags,
            posteriors,
        })
    }

    /// Decode every record; the first malformed or invalid record fails the
    /// whole buffer.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<GameRecord>, CodecError> {
        let count = self.record_count(bytes.len())?;
        let mut out = Vec::with_capacity(count);
        for (index, chunk) in bytes.chunks_exact(self.record_width()).enumerate() {
            let r = self.decode_one(index, chunk)?;
            r.check_invariants(&self.geometry)
                .map_err(|violation| CodecError::Invariant { index, violation })?;
            out.push(r);
        }
        Ok(out)
    }

    /// Decode every record, setting aside those that break an invariant.
    ///
    /// Format errors still fail the whole buffer: a misframed file cannot be
    /// trusted past the first bad byte.
    pub fn decode_lenient(&self, bytes: &[u8]) -> Result<DecodedRecords, FormatError> {
        let count = self.record_count(bytes.len())?;
        let mut out = DecodedRecords {
            records: Vec::with_capacity(count),
            dropped: Vec::new(),
        };
        for (index, chunk) in bytes.chunks_exact(self.record_width()).enumerate() {
            let r = self.decode_one(index, chunk)?;
            match r.check_invariants(&self.geometry) {
                Ok(()) => out.records.push(r),
                Err(v) => out.dropped.push((index, v)),
            }
        }
        Ok(out)
    }
}

/// Output of [`RecordLayout::decode_lenient`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecords {
    pub records: Vec<GameRecord>,
    /// Record index within the buffer and the invariant it broke.
    pub dropped: Vec<(usize, InvariantViolation)>,
}

/// Reads fields from a buffer whose length was already checked.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut a = [0u8; N];
        a.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        a
    }

    fn u8(&mut self) -> u8 {
        let b = self.buf[self.pos];
        self.pos += 1;
        b
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take::<4>())
    }
}

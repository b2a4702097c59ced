//! Dihedral symmetries of the square board (order 8).
//!
//! ### Transform order (stable; used as an index in caches and tests)
//! | idx | transform        | cell `(r, c)` moves to  |
//! |-----|------------------|-------------------------|
//! | 0   | identity         | `(r, c)`                |
//! | 1   | horizontal flip  | `(r, m-c)`              |
//! | 2   | vertical flip    | `(m-r, c)`              |
//! | 3   | transpose        | `(c, r)`                |
//! | 4   | anti-transpose   | `(m-c, m-r)`            |
//! | 5   | rotate 90° ccw   | `(m-c, r)`              |
//! | 6   | rotate 180°      | `(m-r, m-c)`            |
//! | 7   | rotate 270° ccw  | `(c, m-r)`              |
//!
//! with `m = board_size - 1`. Action vectors are transformed by reshaping
//! their first `board_size²` slots to the board; trailing slots are copied.

use crate::board::Plane;
use crate::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Transform {
    Identity = 0,
    FlipHorizontal = 1,
    FlipVertical = 2,
    Transpose = 3,
    AntiTranspose = 4,
    Rot90 = 5,
    Rot180 = 6,
    Rot270 = 7,
}

/// All transforms in index order.
pub const ALL_TRANSFORMS: [Transform; 8] = [
    Transform::Identity,
    Transform::FlipHorizontal,
    Transform::FlipVertical,
    Transform::Transpose,
    Transform::AntiTranspose,
    Transform::Rot90,
    Transform::Rot180,
    Transform::Rot270,
];

impl Transform {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        ALL_TRANSFORMS.get(i).copied()
    }

    pub fn inverse(self) -> Self {
        match self {
            Transform::Rot90 => Transform::Rot270,
            Transform::Rot270 => Transform::Rot90,
            t => t,
        }
    }

    /// Where cell `(r, c)` of an `n × n` board lands.
    #[inline]
    pub fn map_cell(self, r: usize, c: usize, n: usize) -> (usize, usize) {
        let m = n - 1;
        match self {
            Transform::Identity => (r, c),
            Transform::FlipHorizontal => (r, m - c),
            Transform::FlipVertical => (m - r, c),
            Transform::Transpose => (c, r),
            Transform::AntiTranspose => (m - c, m - r),
            Transform::Rot90 => (m - c, r),
            Transform::Rot180 => (m - r, m - c),
            Transform::Rot270 => (c, m - r),
        }
    }

    /// Flat destination index of flat source index `i`.
    #[inline]
    pub fn map_index(self, i: usize, n: usize) -> usize {
        let (r, c) = self.map_cell(i / n, i % n, n);
        r * n + c
    }

    /// Transform the row-major board prefix of `src` into `dst`; any slots
    /// past `n²` are copied unchanged.
    pub fn apply_cells<T: Copy>(self, src: &[T], n: usize, dst: &mut [T]) {
        debug_assert_eq!(src.len(), dst.len());
        let cells = n * n;
        for i in 0..cells {
            dst[self.map_index(i, n)] = src[i];
        }
        dst[cells..].copy_from_slice(&src[cells..]);
    }

    pub fn apply_plane(self, p: &Plane) -> Plane {
        let n = p.size();
        let mut out = Plane::zeros(n);
        self.apply_cells(p.as_slice(), n, out.as_mut_slice());
        out
    }

    /// Transform a legal-mask or policy vector laid out for an `n × n` board.
    pub fn apply_actions<T: Copy>(self, v: &[T], n: usize) -> Vec<T> {
        let mut out = v.to_vec();
        self.apply_cells(v, n, &mut out);
        out
    }

    /// Transform the planes and action vectors of a sample together.
    pub fn apply_sample(self, s: &Sample) -> Sample {
        if self == Transform::Identity {
            return s.clone();
        }
        let n = s.black.size();
        Sample {
            black: self.apply_plane(&s.black),
            white: self.apply_plane(&s.white),
            side: s.side,
            legal_mask: self.apply_actions(&s.legal_mask, n),
            policy: self.apply_actions(&s.policy, n),
            value: s.value,
        }
    }
}

/// The eight variants of `plane`, in [`ALL_TRANSFORMS`] order.
pub fn variants(plane: &Plane) -> [Plane; 8] {
    ALL_TRANSFORMS.map(|t| t.apply_plane(plane))
}

/// Positional score of `black + white` after transform `t`.
///
/// The weight of a cell is its flat index, i.e. an integer-scaled
/// `linspace(0, 1, n²)`; the sum is exact for 0/1 planes.
pub fn orientation_score(black: &Plane, white: &Plane, t: Transform) -> f64 {
    let n = black.size();
    let b = black.as_slice();
    let w = white.as_slice();
    let mut score = 0.0f64;
    for i in 0..n * n {
        let occ = b[i] as f64 + w[i] as f64;
        if occ != 0.0 {
            score += occ * t.map_index(i, n) as f64;
        }
    }
    score
}

/// Pick the orientation with the highest [`orientation_score`]; ties go to
/// the lowest transform index.
pub fn canonical_transform(black: &Plane, white: &Plane) -> Transform {
    let mut best = Transform::Identity;
    let mut best_score = orientation_score(black, white, best);
    for &t in &ALL_TRANSFORMS[1..] {
        let s = orientation_score(black, white, t);
        if s > best_score {
            best = t;
            best_score = s;
        }
    }
    best
}

/// Rotate/reflect both planes into canonical orientation.
pub fn normalize(black: &Plane, white: &Plane) -> (Plane, Plane, Transform) {
    let t = canonical_transform(black, white);
    (t.apply_plane(black), t.apply_plane(white), t)
}

/// All eight variants of a sample; side and value are shared by every copy.
pub fn augment(sample: &Sample) -> [Sample; 8] {
    ALL_TRANSFORMS.map(|t| t.apply_sample(sample))
}

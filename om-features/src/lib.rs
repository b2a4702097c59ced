//! om-features: Board planes, dihedral symmetries, and sample deduplication.

pub mod board;
pub mod dedup;
pub mod pipeline;
pub mod sample;
pub mod symmetry;

pub use board::{decode_board, encode_board, Plane};
pub use dedup::{canonicalize, dedup, state_key, DedupStats, StateKey};
pub use pipeline::{preprocess, PreprocessOptions};
pub use sample::{Sample, SampleRow, SampleSet, SampleTensors, SampleTensorsRef, ShapeError};
pub use symmetry::{
    augment, canonical_transform, normalize, orientation_score, variants, Transform,
    ALL_TRANSFORMS,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}

#[cfg(test)]
mod test_util;


#[cfg(test)]
mod dedup_tests;

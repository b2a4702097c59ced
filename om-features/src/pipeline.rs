//! Per-generation preprocessing: dedup, then augmentation, into one arena.

use om_core::BoardGeometry;

use crate::dedup::{dedup, DedupStats};
use crate::sample::{Sample, SampleSet, ShapeError};
use crate::symmetry::ALL_TRANSFORMS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    pub dedup: bool,
    pub augment: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            dedup: true,
            augment: true,
        }
    }
}

/// Dedup runs first: augmentation emits exactly the reflections dedup
/// would fold back together.
pub fn preprocess(
    geometry: BoardGeometry,
    samples: Vec<Sample>,
    opts: PreprocessOptions,
) -> Result<(SampleSet, DedupStats), ShapeError> {
    let (samples, stats) = if opts.dedup {
        dedup(samples)
    } else {
        let n = samples.len();
        (
            samples,
            DedupStats {
                input: n,
                output: n,
                merged_groups: 0,
            },
        )
    };

    let fanout = if opts.augment { ALL_TRANSFORMS.len() } else { 1 };
    let mut set = SampleSet::with_capacity(geometry, samples.len() * fanout);
    for s in &samples {
        if opts.augment {
            for t in ALL_TRANSFORMS {
                set.push(&t.apply_sample(s))?;
            }
        } else {
            set.push(s)?;
        }
    }
    Ok((set, stats))
}

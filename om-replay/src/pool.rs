//! Resident generations and their sampling weights.

use std::collections::BTreeMap;

use om_features::SampleSet;

#[derive(Debug, Clone)]
pub struct Resident {
    pub samples: SampleSet,
    pub weight: f64,
}

/// Generations currently held in memory, keyed by generation index.
#[derive(Debug, Clone, Default)]
pub struct ResidentPool {
    entries: BTreeMap<u64, Resident>,
}

impl ResidentPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, generation: u64) -> bool {
        self.entries.contains_key(&generation)
    }

    pub fn get(&self, generation: u64) -> Option<&Resident> {
        self.entries.get(&generation)
    }

    pub fn weight(&self, generation: u64) -> Option<f64> {
        self.entries.get(&generation).map(|r| r.weight)
    }

    /// Resident generations, ascending.
    pub fn generations(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn newest(&self) -> Option<u64> {
        self.entries.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Resident)> {
        self.entries.iter().map(|(&g, r)| (g, r))
    }

    pub fn total_samples(&self) -> usize {
        self.entries.values().map(|r| r.samples.len()).sum()
    }

    /// Multiply every existing weight by `decay`, then add `generation` at 1.0.
    pub fn insert_decayed(&mut self, generation: u64, samples: SampleSet, decay: f64) {
        for r in self.entries.values_mut() {
            r.weight *= decay;
        }
        self.entries.insert(
            generation,
            Resident {
                samples,
                weight: 1.0,
            },
        );
    }

    /// Drop every generation below `first_kept`; returns the dropped indices.
    pub fn evict_below(&mut self, first_kept: u64) -> Vec<u64> {
        let kept = self.entries.split_off(&first_kept);
        let evicted = std::mem::replace(&mut self.entries, kept);
        evicted.into_keys().collect()
    }
}

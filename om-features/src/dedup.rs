//! Merge samples that describe the same position up to symmetry and color.
//!
//! Key: `black - white` in canonical orientation, negated when white is to
//! move. Occupancy planes are 0/1 and mutually exclusive, so the key is
//! bijective with the (black, white, side-relative) position.

use rustc_hash::FxHashMap;

use crate::sample::Sample;
use crate::symmetry::canonical_transform;

pub type StateKey = Vec<i8>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub output: usize,
    /// Groups that had more than one member.
    pub merged_groups: usize,
}

/// Canonical key of a sample that is already in canonical orientation.
pub fn state_key(s: &Sample) -> StateKey {
    let sign: i8 = if s.side == 1 { -1 } else { 1 };
    s.black
        .as_slice()
        .iter()
        .zip(s.white.as_slice())
        .map(|(&b, &w)| sign * ((b != 0.0) as i8 - (w != 0.0) as i8))
        .collect()
}

/// Rotate/reflect a sample (planes and action vectors) to canonical orientation.
pub fn canonicalize(s: &Sample) -> Sample {
    canonical_transform(&s.black, &s.white).apply_sample(s)
}

struct Group {
    rep: Sample,
    count: usize,
    value_sum: f64,
    policy_sum: Vec<f64>,
}

impl Group {
    fn new(s: Sample) -> Self {
        let policy_sum = s.policy.iter().map(|&p| p as f64).collect();
        Self {
            value_sum: s.value as f64,
            policy_sum,
            count: 1,
            rep: s,
        }
    }

    fn add(&mut self, s: Sample) {
        self.count += 1;
        self.value_sum += s.value as f64;
        for (acc, &p) in self.policy_sum.iter_mut().zip(&s.policy) {
            *acc += p as f64;
        }
        // Black-to-move members represent the group when present.
        if s.side < self.rep.side {
            self.rep = s;
        }
    }

    fn finish(self) -> Sample {
        if self.count == 1 {
            return self.rep;
        }
        let k = self.count as f64;
        let mut rep = self.rep;
        rep.value = (self.value_sum / k) as f32;
        for (p, acc) in rep.policy.iter_mut().zip(&self.policy_sum) {
            *p = (acc / k) as f32;
        }
        rep
    }
}

/// Deduplicate `samples`.
///
/// Every output sample is in canonical orientation. Groups keep the order
/// of their first member; value and policy targets of a group are the
/// arithmetic means over its members.
pub fn dedup(samples: Vec<Sample>) -> (Vec<Sample>, DedupStats) {
    let input = samples.len();
    let mut index: FxHashMap<StateKey, usize> = FxHashMap::default();
    let mut groups: Vec<Group> = Vec::with_capacity(input);

    for s in samples {
        let c = canonicalize(&s);
        let key = state_key(&c);
        match index.get(&key) {
            Some(&gi) => groups[gi].add(c),
            None => {
                index.insert(key, groups.len());
                groups.push(Group::new(c));
            }
        }
    }

    let merged_groups = groups.iter().filter(|g| g.count > 1).count();
    let out: Vec<Sample> = groups.into_iter().map(Group::finish).collect();
    let stats = DedupStats {
        input,
        output: out.len(),
        merged_groups,
    };
    (out, stats)
}

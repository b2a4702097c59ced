//! om-bench: Deterministic fixtures for the replay benchmarks.

use om_core::BoardGeometry;
use om_features::Sample;
use om_replay::GameRecord;

/// Simple deterministic xorshift64, no rand dependency.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

/// Mid-game style record: disjoint stones, uniform policy over some empty cells.
pub fn gen_record(rng: &mut XorShift, g: &BoardGeometry) -> GameRecord {
    let mask = g.occupancy_mask();
    let mut black = rng.next_u64() & rng.next_u64() & mask;
    let mut white = rng.next_u64() & rng.next_u64() & mask & !black;
    let empty = !(black | white) & mask;
    let mut legal_flags: Vec<bool> = (0..g.n_actions)
        .map(|i| i < g.cells() && (empty >> i) & 1 == 1 && rng.next_u64() % 3 == 0)
        .collect();
    if !legal_flags.iter().any(|&l| l) {
        let last = g.cells() - 1;
        black &= !(1u64 << last);
        white &= !(1u64 << last);
        legal_flags[last] = true;
    }
    let n_legal = legal_flags.iter().filter(|&&l| l).count().max(1);
    let p = 1.0 / n_legal as f32;
    GameRecord {
        black_occupancy: black,
        white_occupancy: white,
        side: (rng.next_u64() & 1) as u8,
        action: 0,
        q: 0.0,
        result: [-1.0, 0.0, 1.0][(rng.next_u64() % 3) as usize],
        posteriors: legal_flags.iter().map(|&l| if l { p } else { 0.0 }).collect(),
        legal_flags,
    }
}

pub fn gen_records(n: usize, g: &BoardGeometry) -> Vec<GameRecord> {
    let mut rng = XorShift::new(0x1234_5678_9ABC_DEF0);
    (0..n).map(|_| gen_record(&mut rng, g)).collect()
}

pub fn gen_samples(n: usize, g: &BoardGeometry) -> Vec<Sample> {
    gen_records(n, g)
        .iter()
        .map(|r| r.to_sample(g, 0.0))
        .collect()
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_satisfy_record_invariants() {
        let g = BoardGeometry::default();
        for r in gen_records(256, &g) {
            r.check_invariants(&g).unwrap();
        }
    }
}

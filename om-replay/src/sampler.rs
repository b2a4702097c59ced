//! Weighted minibatch sampling over the resident pool.
//!
//! A batch comes from a single generation: pick a generation with
//! probability proportional to its weight, then draw `batch_size` distinct
//! rows from it (all rows if it holds fewer).

use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::error::ReplayError;
use crate::pool::ResidentPool;

/// One minibatch in row-major `f32` tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Minibatch {
    pub generation: u64,
    pub board_size: usize,
    pub n_actions: usize,
    /// `[len, board_size, board_size]`
    pub black: Vec<f32>,
    /// `[len, board_size, board_size]`
    pub white: Vec<f32>,
    /// `[len]`
    pub side: Vec<f32>,
    /// `[len, n_actions]`
    pub legal_mask: Vec<f32>,
    /// `[len, n_actions]`
    pub policy: Vec<f32>,
    /// `[len]`
    pub value: Vec<f32>,
}

impl Minibatch {
    pub fn len(&self) -> usize {
        self.side.len()
    }

    pub fn is_empty(&self) -> bool {
        self.side.is_empty()
    }

    pub fn plane_shape(&self) -> [usize; 3] {
        [self.len(), self.board_size, self.board_size]
    }

    pub fn action_shape(&self) -> [usize; 2] {
        [self.len(), self.n_actions]
    }

    /// `(black, white, side, legal_mask, value, policy)`, the order the
    /// training step consumes.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>) {
        (
            self.black,
            self.white,
            self.side,
            self.legal_mask,
            self.value,
            self.policy,
        )
    }
}

pub struct Sampler {
    batch_size: usize,
    rng: ChaCha8Rng,
}

impl Sampler {
    pub fn new(batch_size: usize, seed: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pick a generation by weight, ignoring generations with no samples.
    pub fn pick_generation(&mut self, pool: &ResidentPool) -> Result<u64, ReplayError> {
        let (gens, weights): (Vec<u64>, Vec<f64>) = pool
            .iter()
            .filter(|(_, r)| !r.samples.is_empty() && r.weight > 0.0)
            .map(|(g, r)| (g, r.weight))
            .unzip();
        if gens.is_empty() {
            return Err(ReplayError::EmptyPool);
        }
        let dist = WeightedIndex::new(&weights).map_err(|_| ReplayError::EmptyPool)?;
        Ok(gens[dist.sample(&mut self.rng)])
    }

    pub fn sample(&mut self, pool: &ResidentPool) -> Result<Minibatch, ReplayError> {
        let g = self.pick_generation(pool)?;
        let set = &pool.get(g).ok_or(ReplayError::EmptyPool)?.samples;
        let geometry = *set.geometry();
        let cells = geometry.cells();
        let a = geometry.n_actions;
        let n = self.batch_size.min(set.len());
        let rows = rand::seq::index::sample(&mut self.rng, set.len(), n);

        let mut b = Minibatch {
            generation: g,
            board_size: geometry.board_size,
            n_actions: a,
            black: Vec::with_capacity(n * cells),
            white: Vec::with_capacity(n * cells),
            side: Vec::with_capacity(n),
            legal_mask: Vec::with_capacity(n * a),
            policy: Vec::with_capacity(n * a),
            value: Vec::with_capacity(n),
        };
        for i in rows.iter() {
            let r = set.row(i);
            b.black.extend_from_slice(r.black);
            b.white.extend_from_slice(r.white);
            b.side.push(r.side);
            b.legal_mask.extend_from_slice(r.legal_mask);
            b.policy.extend_from_slice(r.policy);
            b.value.push(r.value);
        }
        Ok(b)
    }
}

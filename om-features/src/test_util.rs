use om_core::BoardGeometry;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::sample::Sample;

/// Random position with disjoint stones, at least one legal move on an empty
/// cell, and a policy that sums to 1 over the legal moves.
pub fn random_sample(rng: &mut ChaCha8Rng, g: &BoardGeometry) -> Sample {
    let cells = g.cells();
    let mut black = 0u64;
    let mut white = 0u64;
    for i in 0..cells {
        match rng.gen_range(0..3) {
            0 => black |= 1u64 << i,
            1 => white |= 1u64 << i,
            _ => {}
        }
    }
    let mut legal = vec![false; g.n_actions];
    for (i, l) in legal.iter_mut().enumerate() {
        let empty = i >= cells || ((black | white) >> i) & 1 == 0;
        *l = empty && rng.gen_bool(0.3);
    }
    if !legal.iter().any(|&l| l) {
        legal[g.n_actions - 1] = true;
    }
    let mut post: Vec<f32> = legal
        .iter()
        .map(|&l| if l { rng.gen_range(0.01f32..1.0) } else { 0.0 })
        .collect();
    let sum: f32 = post.iter().sum();
    for p in &mut post {
        *p /= sum;
    }
    let side = rng.gen_range(0..2u8);
    let value = rng.gen_range(-1.0f32..=1.0);
    Sample::from_record_parts(g, black, white, side, &legal, &post, value)
}

/// Sample with the given stones, uniform policy over `legal` cells.
pub fn sample_with(
    g: &BoardGeometry,
    black: &[(usize, usize)],
    white: &[(usize, usize)],
    legal: &[(usize, usize)],
    side: u8,
    value: f32,
) -> Sample {
    let n = g.board_size;
    let bits = |cells: &[(usize, usize)]| cells.iter().fold(0u64, |x, &(r, c)| x | 1u64 << (r * n + c));
    let mut flags = vec![false; g.n_actions];
    for &(r, c) in legal {
        flags[r * n + c] = true;
    }
    let p = 1.0 / legal.len() as f32;
    let post: Vec<f32> = flags.iter().map(|&l| if l { p } else { 0.0 }).collect();
    Sample::from_record_parts(g, bits(black), bits(white), side, &flags, &post, value)
}

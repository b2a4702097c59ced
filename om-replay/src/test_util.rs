use std::path::Path;
use std::time::Duration;

use om_core::BoardGeometry;
use om_features::PreprocessOptions;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::codec::{GameRecord, RecordLayout};
use crate::window::WindowOptions;
use crate::writer::{ShardWriter, ShardWriterConfig};

/// Record with stones on the given flat cells and a uniform policy over
/// `legal`.
pub fn record(
    black: &[usize],
    white: &[usize],
    legal: &[usize],
    side: u8,
    result: f32,
) -> GameRecord {
    let g = BoardGeometry::default();
    let bits = |cells: &[usize]| cells.iter().fold(0u64, |x, &i| x | 1u64 << i);
    let mut legal_flags = vec![false; g.n_actions];
    for &i in legal {
        legal_flags[i] = true;
    }
    let p = 1.0 / legal.len() as f32;
    GameRecord {
        black_occupancy: bits(black),
        white_occupancy: bits(white),
        side,
        action: legal[0] as u8,
        q: result * 0.5,
        result,
        posteriors: legal_flags.iter().map(|&l| if l { p } else { 0.0 }).collect(),
        legal_flags,
    }
}

pub fn random_record(rng: &mut ChaCha8Rng) -> GameRecord {
    let g = BoardGeometry::default();
    let mut black = Vec::new();
    let mut white = Vec::new();
    let mut legal = Vec::new();
    for i in 0..g.cells() {
        match rng.gen_range(0..4) {
            0 => black.push(i),
            1 => white.push(i),
            2 => legal.push(i),
            _ => {}
        }
    }
    if legal.is_empty() {
        legal.push(63);
        black.retain(|&i| i != 63);
        white.retain(|&i| i != 63);
    }
    let result = [-1.0f32, 0.0, 1.0][rng.gen_range(0..3)];
    record(&black, &white, &legal, rng.gen_range(0..2u8), result)
}

/// Distinct, asymmetric positions: generation `gen`, record `i`.
pub fn tagged_records(gen: u64, n: usize) -> Vec<GameRecord> {
    (0..n)
        .map(|i| {
            let a = (gen as usize * 7 + i) % 60;
            record(&[a], &[a + 1, a + 3], &[a + 2], 0, 0.0)
        })
        .collect()
}

pub fn write_shard(dir: &Path, generation: u64, shard: usize, records: &[GameRecord]) {
    let mut w = ShardWriter::new(ShardWriterConfig {
        data_dir: dir.to_path_buf(),
        generation,
        shard,
        layout: RecordLayout::new(BoardGeometry::default()),
    })
    .unwrap();
    w.extend(records).unwrap();
    w.finish().unwrap();
}

/// All `n_thread` shards of one generation, `per_shard` records each.
pub fn write_generation(dir: &Path, generation: u64, n_thread: usize, per_shard: usize) {
    let all = tagged_records(generation, n_thread * per_shard);
    for (k, chunk) in all.chunks(per_shard).enumerate() {
        write_shard(dir, generation, k, chunk);
    }
}

/// No augmentation or dedup, so sample counts equal record counts.
pub fn window_opts(dir: &Path, n_thread: usize, window_size: usize) -> WindowOptions {
    WindowOptions {
        data_dir: dir.to_path_buf(),
        geometry: BoardGeometry::default(),
        window_size,
        n_thread,
        poll_interval: Duration::from_millis(200),
        max_wait: Duration::from_secs(5),
        decay_factor: 0.9,
        q_frac: 0.0,
        preprocess: PreprocessOptions {
            dedup: false,
            augment: false,
        },
        cache: true,
        start_generation: 0,
        event_log: None,
    }
}

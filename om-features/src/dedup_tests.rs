use om_core::BoardGeometry;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::dedup::{canonicalize, dedup, state_key};
use crate::sample::Sample;
use crate::symmetry::{Transform, ALL_TRANSFORMS};
use crate::test_util::{random_sample, sample_with};

fn asymmetric(g: &BoardGeometry, side: u8, value: f32) -> Sample {
    sample_with(
        g,
        &[(0, 1), (2, 2)],
        &[(1, 3)],
        &[(0, 0), (5, 6)],
        side,
        value,
    )
}

#[test]
fn reflections_merge_and_average_values() {
    let g = BoardGeometry::default();
    let a = asymmetric(&g, 0, 0.2);
    let b = Transform::Rot90.apply_sample(&asymmetric(&g, 0, 0.8));

    let (out, stats) = dedup(vec![a, b]);
    assert_eq!(out.len(), 1);
    assert_eq!(stats.input, 2);
    assert_eq!(stats.output, 1);
    assert_eq!(stats.merged_groups, 1);
    assert!((out[0].value - 0.5).abs() < 1e-6, "value={}", out[0].value);
}

#[test]
fn policies_are_averaged_in_canonical_orientation() {
    let g = BoardGeometry::default();
    let mut a = asymmetric(&g, 0, 0.0);
    a.policy[0] = 0.9; // (0,0)
    a.policy[5 * 8 + 6] = 0.1; // (5,6)
    let mut b = asymmetric(&g, 0, 0.0);
    b.policy[0] = 0.3;
    b.policy[5 * 8 + 6] = 0.7;
    let b = Transform::FlipVertical.apply_sample(&b);

    let (out, _) = dedup(vec![a.clone(), b]);
    assert_eq!(out.len(), 1);

    let t = crate::symmetry::canonical_transform(&a.black, &a.white);
    let i00 = t.map_index(0, 8);
    let i56 = t.map_index(5 * 8 + 6, 8);
    assert!((out[0].policy[i00] - 0.6).abs() < 1e-6);
    assert!((out[0].policy[i56] - 0.4).abs() < 1e-6);
    assert!((out[0].policy.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    assert_eq!(out[0].legal_mask[i00], 1.0);
    assert_eq!(out[0].legal_mask[i56], 1.0);
}

#[test]
fn color_swapped_position_merges_into_black_to_move() {
    let g = BoardGeometry::default();
    let a = asymmetric(&g, 0, 1.0);
    let mut swapped = asymmetric(&g, 1, 0.0);
    std::mem::swap(&mut swapped.black, &mut swapped.white);

    let (out, stats) = dedup(vec![swapped, a.clone()]);
    assert_eq!(stats.merged_groups, 1);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].side, 0);
    assert_eq!(out[0].black, canonicalize(&a).black);
    assert!((out[0].value - 0.5).abs() < 1e-6);
}

#[test]
fn different_positions_are_kept_apart() {
    let g = BoardGeometry::default();
    let a = asymmetric(&g, 0, 0.1);
    let b = sample_with(&g, &[(0, 1), (2, 2)], &[(1, 4)], &[(0, 0)], 0, 0.9);
    let c = sample_with(&g, &[(0, 1), (2, 2)], &[(1, 3)], &[(0, 0)], 1, 0.9);

    let (out, stats) = dedup(vec![a.clone(), b.clone(), c]);
    assert_eq!(out.len(), 3);
    assert_eq!(stats.merged_groups, 0);
    assert_eq!(out[0], canonicalize(&a));
    assert_eq!(out[1], canonicalize(&b));
}

#[test]
fn dedup_is_idempotent() {
    let g = BoardGeometry::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut samples: Vec<Sample> = (0..64).map(|_| random_sample(&mut rng, &g)).collect();
    // Inject reflected duplicates.
    for i in 0..16 {
        let t = ALL_TRANSFORMS[i % 8];
        let mut d = t.apply_sample(&samples[i]);
        d.value = -d.value;
        samples.push(d);
    }

    let (once, s1) = dedup(samples);
    // Identity copies always collide; reflections do unless the orientation
    // score ties.
    assert!(s1.merged_groups >= 2);
    assert!(s1.output < s1.input);
    let (twice, s2) = dedup(once.clone());
    assert_eq!(s2.merged_groups, 0);
    assert_eq!(twice, once);
}

#[test]
fn dedup_is_order_independent() {
    let g = BoardGeometry::default();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut samples: Vec<Sample> = (0..32).map(|_| random_sample(&mut rng, &g)).collect();
    for i in 0..8 {
        samples.push(Transform::Rot180.apply_sample(&samples[i]));
    }

    let summarize = |v: Vec<Sample>| {
        let mut rows: Vec<(Vec<i8>, u8, i64)> = v
            .iter()
            .map(|s| (state_key(s), s.side, (s.value * 1e5).round() as i64))
            .collect();
        rows.sort();
        rows
    };

    let (a, _) = dedup(samples.clone());
    samples.shuffle(&mut rng);
    let (b, _) = dedup(samples);
    assert_eq!(summarize(a), summarize(b));
}

use std::fs;

use om_core::BoardGeometry;
use om_features::{preprocess, DedupStats, PreprocessOptions, Sample};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::cache::{read_cache, write_cache, CacheKey, CachedStats};
use crate::codec::RecordLayout;
use crate::error::ReplayError;
use crate::test_util::random_record;

fn fixture() -> (Vec<u8>, om_features::SampleSet, DedupStats) {
    let g = BoardGeometry::default();
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let records: Vec<_> = (0..12).map(|_| random_record(&mut rng)).collect();
    let bytes = RecordLayout::new(g).encode(&records).unwrap();
    let samples: Vec<Sample> = records.iter().map(|r| r.to_sample(&g, 0.0)).collect();
    let (set, stats) = preprocess(g, samples, PreprocessOptions::default()).unwrap();
    (bytes, set, stats)
}

#[test]
fn cache_reloads_identical_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.safetensors");
    let (bytes, set, dedup) = fixture();
    let key = CacheKey::new(&bytes, BoardGeometry::default(), PreprocessOptions::default(), 0.0);
    let stats = CachedStats {
        records: 12,
        dropped_records: 0,
        dedup,
    };

    write_cache(&path, &set, &key, &stats).unwrap();
    assert!(!dir.path().join("0.safetensors.tmp").exists());
    let (loaded, loaded_stats) = read_cache(&path, &key).unwrap().unwrap();
    assert_eq!(loaded, set);
    assert_eq!(loaded_stats, stats);
}

#[test]
fn missing_cache_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(b"", BoardGeometry::default(), PreprocessOptions::default(), 0.0);
    assert!(read_cache(&dir.path().join("9.safetensors"), &key)
        .unwrap()
        .is_none());
}

#[test]
fn cache_is_stale_when_source_or_settings_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.safetensors");
    let (bytes, set, dedup) = fixture();
    let g = BoardGeometry::default();
    let opts = PreprocessOptions::default();
    let key = CacheKey::new(&bytes, g, opts, 0.0);
    let stats = CachedStats {
        records: 12,
        dropped_records: 0,
        dedup,
    };
    write_cache(&path, &set, &key, &stats).unwrap();

    let mut edited = bytes.clone();
    edited[0] ^= 1;
    assert!(read_cache(&path, &CacheKey::new(&edited, g, opts, 0.0))
        .unwrap()
        .is_none());
    assert!(read_cache(&path, &CacheKey::new(&bytes, g, opts, 0.5))
        .unwrap()
        .is_none());
    let no_aug = PreprocessOptions {
        augment: false,
        ..opts
    };
    assert!(read_cache(&path, &CacheKey::new(&bytes, g, no_aug, 0.0))
        .unwrap()
        .is_none());
    assert!(read_cache(&path, &key).unwrap().is_some());
}

#[test]
fn corrupt_cache_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.safetensors");
    fs::write(&path, b"not a safetensors file").unwrap();
    let key = CacheKey::new(b"", BoardGeometry::default(), PreprocessOptions::default(), 0.0);
    assert!(read_cache(&path, &key).unwrap().is_none());
}

#[test]
fn failed_cache_write_leaves_no_temporary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.safetensors");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("occupied"), b"x").unwrap();
    let (bytes, set, dedup) = fixture();
    let key = CacheKey::new(&bytes, BoardGeometry::default(), PreprocessOptions::default(), 0.0);
    let stats = CachedStats {
        records: 12,
        dropped_records: 0,
        dedup,
    };

    let err = write_cache(&path, &set, &key, &stats).unwrap_err();
    assert!(matches!(err, ReplayError::Io(_)));
    assert!(!dir.path().join("0.safetensors.tmp").exists());
}

#[test]
fn unreadable_cache_path_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0.safetensors");
    fs::create_dir(&path).unwrap();
    let key = CacheKey::new(b"", BoardGeometry::default(), PreprocessOptions::default(), 0.0);
    assert!(read_cache(&path, &key).unwrap().is_none());
}

//! Decoded-generation cache: `{g}.safetensors` next to `{g}.dat`.
//!
//! The cache is only trusted when its metadata matches the source file
//! (length and blake3), the geometry, and the preprocessing settings. Any
//! mismatch or unreadable cache is treated as a miss and rebuilt.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use bytemuck::cast_slice;
use om_core::BoardGeometry;
use om_features::{DedupStats, PreprocessOptions, SampleSet, SampleTensors};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use crate::error::ReplayError;
use crate::merge::tmp_path;
use crate::schema::*;

/// What a cache must have been built from to be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub source_len: u64,
    pub source_blake3: String,
    pub geometry: BoardGeometry,
    pub preprocess: String,
}

impl CacheKey {
    pub fn new(
        source: &[u8],
        geometry: BoardGeometry,
        opts: PreprocessOptions,
        q_frac: f32,
    ) -> Self {
        Self {
            source_len: source.len() as u64,
            source_blake3: om_logging::hash_bytes(source),
            geometry,
            preprocess: format!(
                "dedup={},augment={},q_frac={:08x}",
                opts.dedup,
                opts.augment,
                q_frac.to_bits()
            ),
        }
    }

    fn matches(&self, m: &HashMap<String, String>) -> bool {
        let get = |k: &str| m.get(k).map(String::as_str);
        get(M_FORMAT_VERSION) == Some(RECORD_FORMAT_VERSION.to_string().as_str())
            && get(M_SOURCE_LEN) == Some(self.source_len.to_string().as_str())
            && get(M_SOURCE_BLAKE3) == Some(self.source_blake3.as_str())
            && get(M_BOARD_SIZE) == Some(self.geometry.board_size.to_string().as_str())
            && get(M_N_ACTIONS) == Some(self.geometry.n_actions.to_string().as_str())
            && get(M_PREPROCESS) == Some(self.preprocess.as_str())
    }
}

/// Bookkeeping carried alongside the cached tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedStats {
    pub records: usize,
    pub dropped_records: usize,
    pub dedup: DedupStats,
}

/// Write `set` atomically (`.tmp` then rename).
pub fn write_cache(
    path: &Path,
    set: &SampleSet,
    key: &CacheKey,
    stats: &CachedStats,
) -> Result<(), ReplayError> {
    let n = set.len();
    let cells = key.geometry.cells();
    let a = key.geometry.n_actions;
    let t = set.tensors();

    let mut tensors: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
    tensors.insert(T_BLACK.to_string(), f32_view(vec![n, cells], t.black)?);
    tensors.insert(T_WHITE.to_string(), f32_view(vec![n, cells], t.white)?);
    tensors.insert(T_SIDE.to_string(), f32_view(vec![n], t.side)?);
    tensors.insert(T_LEGAL_MASK.to_string(), f32_view(vec![n, a], t.legal_mask)?);
    tensors.insert(T_POLICY.to_string(), f32_view(vec![n, a], t.policy)?);
    tensors.insert(T_VALUE.to_string(), f32_view(vec![n], t.value)?);

    let meta: HashMap<String, String> = [
        (M_FORMAT_VERSION, RECORD_FORMAT_VERSION.to_string()),
        (M_SOURCE_LEN, key.source_len.to_string()),
        (M_SOURCE_BLAKE3, key.source_blake3.clone()),
        (M_BOARD_SIZE, key.geometry.board_size.to_string()),
        (M_N_ACTIONS, key.geometry.n_actions.to_string()),
        (M_PREPROCESS, key.preprocess.clone()),
        (M_RECORDS, stats.records.to_string()),
        (M_DROPPED, stats.dropped_records.to_string()),
        (M_DEDUP_INPUT, stats.dedup.input.to_string()),
        (M_DEDUP_OUTPUT, stats.dedup.output.to_string()),
        (M_DEDUP_MERGED, stats.dedup.merged_groups.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let bytes = safetensors::serialize(&tensors, &Some(meta))?;
    let tmp = tmp_path(path);
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn f32_view(shape: Vec<usize>, data: &[f32]) -> Result<TensorView<'_>, ReplayError> {
    Ok(TensorView::new(Dtype::F32, shape, cast_slice(data))?)
}

/// Load a cache built from `key`, or `None` if it is missing or stale.
pub fn read_cache(
    path: &Path,
    key: &CacheKey,
) -> Result<Option<(SampleSet, CachedStats)>, ReplayError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            log::warn!("{}: cannot read cache ({e}), rebuilding", path.display());
            return Ok(None);
        }
    };
    match parse_cache(&bytes, key) {
        Ok(Some(v)) => Ok(Some(v)),
        Ok(None) => {
            log::debug!("{}: stale cache, rebuilding", path.display());
            Ok(None)
        }
        Err(e) => {
            log::warn!("{}: unreadable cache ({e}), rebuilding", path.display());
            Ok(None)
        }
    }
}

fn parse_cache(
    bytes: &[u8],
    key: &CacheKey,
) -> Result<Option<(SampleSet, CachedStats)>, ReplayError> {
    let (_, header) = SafeTensors::read_metadata(bytes)?;
    let Some(meta) = header.metadata() else {
        return Ok(None);
    };
    if !key.matches(meta) {
        return Ok(None);
    }
    let count = |k: &str| -> usize { meta.get(k).and_then(|v| v.parse().ok()).unwrap_or(0) };
    let stats = CachedStats {
        records: count(M_RECORDS),
        dropped_records: count(M_DROPPED),
        dedup: DedupStats {
            input: count(M_DEDUP_INPUT),
            output: count(M_DEDUP_OUTPUT),
            merged_groups: count(M_DEDUP_MERGED),
        },
    };

    let st = SafeTensors::deserialize(bytes)?;
    let f32s = |name: &str| -> Result<Vec<f32>, ReplayError> {
        let view = st.tensor(name)?;
        if view.dtype() != Dtype::F32 {
            return Err(ReplayError::Cache("tensor is not f32"));
        }
        Ok(view
            .data()
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    };
    let tensors = SampleTensors {
        black: f32s(T_BLACK)?,
        white: f32s(T_WHITE)?,
        side: f32s(T_SIDE)?,
        legal_mask: f32s(T_LEGAL_MASK)?,
        policy: f32s(T_POLICY)?,
        value: f32s(T_VALUE)?,
    };
    let set = SampleSet::from_tensors(key.geometry, tensors)?;
    Ok(Some((set, stats)))
}

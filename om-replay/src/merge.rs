//! Merging a generation's worker shards into one `{g}.dat` file.
//!
//! A generation is complete once every shard `0..n_thread` is present. The
//! merged file is written to `{g}.dat.tmp`, synced, and renamed into place
//! before any shard is deleted, so a crash leaves either the shards or the
//! merged file (never a partial merge under the final name).

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::codec::RecordLayout;
use crate::error::ReplayError;
use crate::schema::{CACHE_EXT, DAT_EXT, TMP_SUFFIX};

pub fn shard_path(dir: &Path, generation: u64, shard: usize) -> PathBuf {
    dir.join(format!("{generation}_{shard}.{DAT_EXT}"))
}

pub fn generation_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{generation}.{DAT_EXT}"))
}

pub fn cache_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{generation}.{CACHE_EXT}"))
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(TMP_SUFFIX);
    PathBuf::from(s)
}

/// `{g}_{k}.dat` -> `(g, k)`.
pub fn parse_shard_name(name: &str) -> Option<(u64, usize)> {
    let stem = name.strip_suffix(DAT_EXT)?.strip_suffix('.')?;
    let (g, k) = stem.split_once('_')?;
    Some((g.parse().ok()?, k.parse().ok()?))
}

/// `{g}.dat` -> `g`.
pub fn parse_generation_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(DAT_EXT)?.strip_suffix('.')?;
    stem.parse().ok()
}

/// Remove temporaries this side of the pipeline owns (`{g}.dat.tmp`,
/// `{g}.safetensors.tmp`). Producer temporaries (`{g}_{k}.dat.tmp`) may
/// belong to a live worker and are left alone.
pub fn cleanup_tmp_files(dir: &Path) -> Result<usize, ReplayError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let p = entry?.path();
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(base) = name.strip_suffix(TMP_SUFFIX) else {
            continue;
        };
        let ours = parse_generation_name(base).is_some()
            || base
                .strip_suffix(CACHE_EXT)
                .and_then(|s| s.strip_suffix('.'))
                .is_some_and(|g| g.parse::<u64>().is_ok());
        if ours && fs::remove_file(&p).is_ok() {
            log::debug!("removed stale temporary {}", p.display());
            removed += 1;
        }
    }
    Ok(removed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStatus {
    pub generation: u64,
    /// Shard indices found on disk, ascending. May include indices `>= expected`.
    pub present: Vec<usize>,
    pub expected: usize,
    /// `{g}.dat` already exists.
    pub merged: bool,
}

impl ShardStatus {
    pub fn present_expected(&self) -> usize {
        self.present.iter().filter(|&&k| k < self.expected).count()
    }

    pub fn is_complete(&self) -> bool {
        self.present_expected() == self.expected
    }

    pub fn stray(&self) -> impl Iterator<Item = usize> + '_ {
        self.present.iter().copied().filter(|&k| k >= self.expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { records: u64, bytes: u64 },
    AlreadyMerged,
    Incomplete { present: usize, expected: usize },
}

pub struct ShardMerger {
    dir: PathBuf,
    n_thread: usize,
    layout: RecordLayout,
}

impl ShardMerger {
    pub fn new(
        dir: impl Into<PathBuf>,
        n_thread: usize,
        layout: RecordLayout,
    ) -> Result<Self, ReplayError> {
        if n_thread == 0 {
            return Err(ReplayError::InvalidOptions("n_thread must be > 0"));
        }
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            n_thread,
            layout,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn n_thread(&self) -> usize {
        self.n_thread
    }

    pub fn shard_status(&self, generation: u64) -> Result<ShardStatus, ReplayError> {
        let mut present = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some((g, k)) = name.to_str().and_then(parse_shard_name) {
                if g == generation {
                    present.push(k);
                }
            }
        }
        present.sort_unstable();
        Ok(ShardStatus {
            generation,
            present,
            expected: self.n_thread,
            merged: generation_path(&self.dir, generation).exists(),
        })
    }

    /// Merged generations on disk, ascending.
    pub fn merged_generations(&self) -> Result<Vec<u64>, ReplayError> {
        let mut out: Vec<u64> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().and_then(parse_generation_name))
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    /// Merge generation `g` if all its shards are present.
    ///
    /// Idempotent: once `{g}.dat` exists, later calls only sweep leftover
    /// shards and report [`MergeOutcome::AlreadyMerged`].
    pub fn merge(&self, generation: u64) -> Result<MergeOutcome, ReplayError> {
        let out = generation_path(&self.dir, generation);
        if out.exists() {
            self.remove_shards(generation)?;
            return Ok(MergeOutcome::AlreadyMerged);
        }

        let status = self.shard_status(generation)?;
        if !status.is_complete() {
            return Ok(MergeOutcome::Incomplete {
                present: status.present_expected(),
                expected: status.expected,
            });
        }
        for k in status.stray() {
            log::warn!(
                "generation {generation}: discarding shard {k} (n_thread={})",
                self.n_thread
            );
        }

        let tmp = tmp_path(&out);
        let (records, bytes) = match self.write_merged(generation, &tmp) {
            Ok(v) => v,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&tmp, &out) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        self.remove_shards(generation)?;

        log::info!(
            "merged generation {generation}: {} shards, {records} records, {bytes} bytes",
            self.n_thread
        );
        Ok(MergeOutcome::Merged { records, bytes })
    }

    fn write_merged(&self, generation: u64, tmp: &Path) -> Result<(u64, u64), ReplayError> {
        let width = self.layout.record_width();
        let mut w = BufWriter::new(File::create(tmp)?);
        let mut total = 0u64;
        for k in 0..self.n_thread {
            let path = shard_path(&self.dir, generation, k);
            let len = fs::metadata(&path)?.len();
            if len % width as u64 != 0 {
                return Err(ReplayError::TruncatedShard { path, len, width });
            }
            let copied = io::copy(&mut File::open(&path)?, &mut w)?;
            if copied != len {
                return Err(ReplayError::TruncatedShard {
                    path,
                    len: copied,
                    width,
                });
            }
            total += copied;
        }
        let f = w.into_inner().map_err(|e| e.into_error())?;
        f.sync_all()?;
        Ok((total / width as u64, total))
    }

    /// Removes every `{g}_*.dat` of the generation, stray indices included.
    fn remove_shards(&self, generation: u64) -> Result<(), ReplayError> {
        let status = self.shard_status(generation)?;
        for &k in &status.present {
            match fs::remove_file(shard_path(&self.dir, generation, k)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

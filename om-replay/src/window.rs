//! Sliding window over the most recent generations.
//!
//! Each [`ReplayWindow::advance`] waits for the next generation's shards,
//! merges them, decodes and preprocesses the merged file, decays every
//! resident weight, installs the new generation at weight 1.0, and evicts
//! whatever fell out of the window (in memory and on disk).

use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use om_core::{BoardGeometry, Config};
use om_features::{preprocess, DedupStats, PreprocessOptions, Sample, SampleSet};
use om_logging::{
    now_ms, AdvanceTimeoutEventV1, GenerationEvictedEventV1, GenerationLoadedEventV1,
    GenerationMergedEventV1, NdjsonWriter, VersionInfoV1,
};
use serde::Serialize;

use crate::cache::{read_cache, write_cache, CacheKey, CachedStats};
use crate::clock::{CancelToken, Clock, SystemClock};
use crate::codec::RecordLayout;
use crate::error::ReplayError;
use crate::merge::{cache_path, cleanup_tmp_files, generation_path, MergeOutcome, ShardMerger};
use crate::pool::ResidentPool;
use crate::schema::RECORD_FORMAT_VERSION;

/// Longest single sleep while waiting, so cancellation is noticed promptly.
pub const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub data_dir: PathBuf,
    pub geometry: BoardGeometry,
    pub window_size: usize,
    pub n_thread: usize,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub decay_factor: f64,
    pub q_frac: f32,
    pub preprocess: PreprocessOptions,
    pub cache: bool,
    pub start_generation: u64,
    pub event_log: Option<PathBuf>,
}

impl WindowOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            data_dir: cfg.replay.data_dir.clone(),
            geometry: cfg.board,
            window_size: cfg.replay.window_size as usize,
            n_thread: cfg.replay.n_thread as usize,
            poll_interval: cfg.replay.poll_interval(),
            max_wait: cfg.replay.max_wait(),
            decay_factor: cfg.training.decay_factor,
            q_frac: cfg.training.q_frac,
            preprocess: PreprocessOptions {
                dedup: cfg.preprocess.dedup,
                augment: cfg.preprocess.augment,
            },
            cache: cfg.preprocess.cache,
            start_generation: cfg.replay.start_generation,
            event_log: cfg.replay.event_log.clone(),
        }
    }

    fn validate(&self) -> Result<(), ReplayError> {
        if self.window_size == 0 {
            return Err(ReplayError::InvalidOptions("window_size must be > 0"));
        }
        if self.n_thread == 0 {
            return Err(ReplayError::InvalidOptions("n_thread must be > 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(ReplayError::InvalidOptions("poll_interval must be > 0"));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ReplayError::InvalidOptions("decay_factor must be in (0,1)"));
        }
        if !(0.0..=1.0).contains(&self.q_frac) {
            return Err(ReplayError::InvalidOptions("q_frac must be in [0,1]"));
        }
        if self.geometry.check().is_err() {
            return Err(ReplayError::InvalidOptions("invalid board geometry"));
        }
        Ok(())
    }
}

/// Outcome of one successful [`ReplayWindow::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceReport {
    pub generation: u64,
    /// Shards were merged by this call (false if `{g}.dat` already existed).
    pub merged_now: bool,
    pub records: usize,
    pub dropped_records: usize,
    pub samples: usize,
    pub dedup: DedupStats,
    pub from_cache: bool,
    pub evicted: Vec<u64>,
    pub waited: Duration,
}

struct LoadedGeneration {
    samples: SampleSet,
    stats: CachedStats,
    from_cache: bool,
}

pub struct ReplayWindow<C: Clock = SystemClock> {
    opts: WindowOptions,
    layout: RecordLayout,
    merger: ShardMerger,
    clock: C,
    cancel: CancelToken,
    pool: ResidentPool,
    next_generation: u64,
    events: Option<NdjsonWriter>,
}

impl ReplayWindow<SystemClock> {
    pub fn from_config(cfg: &Config) -> Result<Self, ReplayError> {
        Self::new(WindowOptions::from_config(cfg), SystemClock::new())
    }
}

impl<C: Clock> ReplayWindow<C> {
    pub fn new(opts: WindowOptions, clock: C) -> Result<Self, ReplayError> {
        opts.validate()?;
        let layout = RecordLayout::new(opts.geometry);
        let merger = ShardMerger::new(&opts.data_dir, opts.n_thread, layout)?;
        let removed = cleanup_tmp_files(merger.dir())?;
        if removed > 0 {
            log::info!(
                "removed {removed} stale temporaries from {}",
                opts.data_dir.display()
            );
        }
        let events = match &opts.event_log {
            Some(p) => Some(NdjsonWriter::open_append_with_flush(p, 1)?),
            None => None,
        };
        Ok(Self {
            next_generation: opts.start_generation,
            opts,
            layout,
            merger,
            clock,
            cancel: CancelToken::new(),
            pool: ResidentPool::new(),
            events,
        })
    }

    pub fn options(&self) -> &WindowOptions {
        &self.opts
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn pool(&self) -> &ResidentPool {
        &self.pool
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Token that aborts a pending wait from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Generation the next `advance()` waits for.
    pub fn next_generation(&self) -> u64 {
        self.next_generation
    }

    pub fn newest(&self) -> Option<u64> {
        self.pool.newest()
    }

    /// Generations the window may hold: `newest+1−window_size ..= newest`.
    pub fn retained_range(&self) -> Option<RangeInclusive<u64>> {
        let newest = self.pool.newest()?;
        Some(self.first_kept(newest)..=newest)
    }

    fn first_kept(&self, newest: u64) -> u64 {
        (newest + 1).saturating_sub(self.opts.window_size as u64)
    }

    /// Wait for, merge, load, and install the next generation.
    ///
    /// On error the pool is unchanged and the same generation is retried on
    /// the next call.
    pub fn advance(&mut self) -> Result<AdvanceReport, ReplayError> {
        let g = self.next_generation;
        let (merged_now, waited) = self.wait_for_merge(g)?;
        let loaded = self.load_generation(g)?;
        let samples = loaded.samples.len();
        let evicted = self.install(g, loaded.samples);
        self.next_generation = g + 1;

        self.emit(&GenerationLoadedEventV1 {
            event: "generation_loaded".to_string(),
            ts_ms: now_ms(),
            v: self.version_info(),
            generation: g,
            records: loaded.stats.records as u64,
            dropped_records: loaded.stats.dropped_records as u64,
            samples: samples as u64,
            dedup_merged: loaded.stats.dedup.merged_groups as u64,
            from_cache: loaded.from_cache,
            resident: self.pool.generations(),
        });
        log::info!(
            "loaded generation {g}: {} records ({} dropped), {samples} samples, resident {:?}",
            loaded.stats.records,
            loaded.stats.dropped_records,
            self.pool.generations()
        );

        Ok(AdvanceReport {
            generation: g,
            merged_now,
            records: loaded.stats.records,
            dropped_records: loaded.stats.dropped_records,
            samples,
            dedup: loaded.stats.dedup,
            from_cache: loaded.from_cache,
            evicted,
            waited,
        })
    }

    /// Reload generations already merged on disk (e.g. after a restart).
    ///
    /// Only the newest `window_size` are loaded; older merged files are
    /// evicted. Must run before the first `advance()`.
    pub fn resume(&mut self) -> Result<Vec<u64>, ReplayError> {
        if !self.pool.is_empty() {
            return Err(ReplayError::InvalidOptions(
                "resume must run before the first advance",
            ));
        }
        let merged: Vec<u64> = self
            .merger
            .merged_generations()?
            .into_iter()
            .filter(|&g| g >= self.opts.start_generation)
            .collect();
        let Some(&newest) = merged.last() else {
            return Ok(Vec::new());
        };
        let first_kept = self.first_kept(newest);
        for &g in merged.iter().filter(|&&g| g < first_kept) {
            self.evict(g)?;
        }
        let mut loaded = Vec::new();
        for &g in merged.iter().filter(|&&g| g >= first_kept) {
            let l = self.load_generation(g)?;
            self.install(g, l.samples);
            loaded.push(g);
        }
        self.next_generation = newest + 1;
        log::info!("resumed generations {loaded:?}");
        Ok(loaded)
    }

    fn wait_for_merge(&mut self, g: u64) -> Result<(bool, Duration), ReplayError> {
        let start = self.clock.now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(ReplayError::Cancelled(g));
            }
            let waited = self.clock.now().saturating_sub(start);
            match self.merger.merge(g)? {
                MergeOutcome::Merged { records, bytes } => {
                    self.emit(&GenerationMergedEventV1 {
                        event: "generation_merged".to_string(),
                        ts_ms: now_ms(),
                        v: self.version_info(),
                        generation: g,
                        shards: self.opts.n_thread as u32,
                        records,
                        bytes,
                    });
                    return Ok((true, waited));
                }
                MergeOutcome::AlreadyMerged => return Ok((false, waited)),
                MergeOutcome::Incomplete { present, expected } => {
                    if waited >= self.opts.max_wait {
                        self.emit(&AdvanceTimeoutEventV1 {
                            event: "advance_timeout".to_string(),
                            ts_ms: now_ms(),
                            v: self.version_info(),
                            generation: g,
                            waited_ms: waited.as_millis() as u64,
                            shards_present: present as u32,
                            shards_expected: expected as u32,
                        });
                        log::warn!(
                            "generation {g}: {present}/{expected} shards after {waited:?}, giving up"
                        );
                        return Err(ReplayError::Timeout {
                            generation: g,
                            waited,
                            present,
                            expected,
                        });
                    }
                    log::debug!("generation {g}: {present}/{expected} shards, waiting");
                    let nap = self.opts.poll_interval.min(self.opts.max_wait - waited);
                    self.sleep_cancellable(nap);
                }
            }
        }
    }

    fn sleep_cancellable(&mut self, d: Duration) {
        let mut left = d;
        while !left.is_zero() && !self.cancel.is_cancelled() {
            let step = left.min(CANCEL_CHECK_INTERVAL);
            self.clock.sleep(step);
            left -= step;
        }
    }

    fn load_generation(&self, g: u64) -> Result<LoadedGeneration, ReplayError> {
        let dir = self.merger.dir();
        let bytes = fs::read(generation_path(dir, g))?;
        let key = CacheKey::new(
            &bytes,
            self.opts.geometry,
            self.opts.preprocess,
            self.opts.q_frac,
        );
        let cpath = cache_path(dir, g);
        if self.opts.cache {
            if let Some((samples, stats)) = read_cache(&cpath, &key)? {
                return Ok(LoadedGeneration {
                    samples,
                    stats,
                    from_cache: true,
                });
            }
        }

        let decoded = self.layout.decode_lenient(&bytes)?;
        for (index, v) in &decoded.dropped {
            log::warn!("generation {g}: dropping record {index}: {v}");
        }
        let samples: Vec<Sample> = decoded
            .records
            .iter()
            .map(|r| r.to_sample(&self.opts.geometry, self.opts.q_frac))
            .collect();
        let (set, dedup) = preprocess(self.opts.geometry, samples, self.opts.preprocess)?;
        let stats = CachedStats {
            records: decoded.records.len() + decoded.dropped.len(),
            dropped_records: decoded.dropped.len(),
            dedup,
        };
        if self.opts.cache {
            write_cache(&cpath, &set, &key, &stats)?;
        }
        Ok(LoadedGeneration {
            samples: set,
            stats,
            from_cache: false,
        })
    }

    fn install(&mut self, g: u64, samples: SampleSet) -> Vec<u64> {
        self.pool.insert_decayed(g, samples, self.opts.decay_factor);
        let evicted = self.pool.evict_below(self.first_kept(g));
        for &old in &evicted {
            if let Err(e) = self.evict(old) {
                log::warn!("generation {old}: could not remove files: {e}");
            }
        }
        evicted
    }

    /// Remove a generation's merged file and cache from disk.
    fn evict(&mut self, g: u64) -> Result<(), ReplayError> {
        let dir = self.merger.dir();
        let mut removed = 0u32;
        for p in [generation_path(dir, g), cache_path(dir, g)] {
            match fs::remove_file(&p) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.emit(&GenerationEvictedEventV1 {
            event: "generation_evicted".to_string(),
            ts_ms: now_ms(),
            v: self.version_info(),
            generation: g,
            files_removed: removed,
        });
        log::debug!("evicted generation {g} ({removed} files)");
        Ok(())
    }

    fn version_info(&self) -> VersionInfoV1 {
        VersionInfoV1 {
            record_format_version: RECORD_FORMAT_VERSION,
            board_size: self.opts.geometry.board_size as u32,
            n_actions: self.opts.geometry.n_actions as u32,
        }
    }

    /// Event-log failures never fail the window.
    fn emit<T: Serialize>(&mut self, event: &T) {
        if let Some(w) = self.events.as_mut() {
            if let Err(e) = w.write_event(event) {
                log::warn!("event log write failed: {e}");
            }
        }
    }
}

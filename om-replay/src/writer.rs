use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::codec::{GameRecord, RecordLayout};
use crate::error::ReplayError;
use crate::merge::{shard_path, tmp_path};

#[derive(Debug, Clone)]
pub struct ShardWriterConfig {
    pub data_dir: PathBuf,
    pub generation: u64,
    pub shard: usize,
    pub layout: RecordLayout,
}

/// Producer side: streams one worker's records for one generation.
///
/// Records go to `{g}_{k}.dat.tmp`; `finish` renames it to `{g}_{k}.dat`, so
/// the merger never sees a shard that is still being written. A writer
/// dropped before a successful `finish` removes its temporary.
pub struct ShardWriter {
    cfg: ShardWriterConfig,
    tmp: PathBuf,
    w: BufWriter<File>,
    buf: Vec<u8>,
    records: u64,
    published: bool,
}

impl ShardWriter {
    pub fn new(cfg: ShardWriterConfig) -> Result<Self, ReplayError> {
        fs::create_dir_all(&cfg.data_dir)?;
        let final_path = shard_path(&cfg.data_dir, cfg.generation, cfg.shard);
        if final_path.exists() {
            return Err(ReplayError::ShardExists(final_path));
        }
        let tmp = tmp_path(&final_path);
        let w = BufWriter::new(File::create(&tmp)?);
        Ok(Self {
            buf: Vec::with_capacity(cfg.layout.record_width()),
            cfg,
            tmp,
            w,
            records: 0,
            published: false,
        })
    }

    pub fn push(&mut self, r: &GameRecord) -> Result<(), ReplayError> {
        self.buf.clear();
        self.cfg.layout.encode_into(&mut self.buf, r)?;
        self.w.write_all(&self.buf)?;
        self.records += 1;
        Ok(())
    }

    pub fn extend<'a, I: IntoIterator<Item = &'a GameRecord>>(
        &mut self,
        it: I,
    ) -> Result<(), ReplayError> {
        for r in it {
            self.push(r)?;
        }
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Publish the shard. Returns the number of records written.
    pub fn finish(mut self) -> Result<u64, ReplayError> {
        let final_path = shard_path(&self.cfg.data_dir, self.cfg.generation, self.cfg.shard);
        self.w.flush()?;
        self.w.get_ref().sync_all()?;
        fs::rename(&self.tmp, &final_path)?;
        self.published = true;
        Ok(self.records)
    }
}

impl Drop for ShardWriter {
    fn drop(&mut self) {
        if !self.published {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

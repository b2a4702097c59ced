//! On-disk names and ids for replay data.
//!
//! ### Data directory layout
//! - `{g}_{k}.dat`       shard `k` of generation `g`, written by a self-play worker
//! - `{g}.dat`           merged generation, written once by the trainer
//! - `{g}.safetensors`   decoded samples of `{g}.dat`
//! - `*.tmp`             in-flight writes, renamed into place when complete

/// Binary record layout version (stamped on events and caches).
pub const RECORD_FORMAT_VERSION: u32 = 1;

pub const DAT_EXT: &str = "dat";
pub const CACHE_EXT: &str = "safetensors";
pub const TMP_SUFFIX: &str = ".tmp";

/// Tensor names inside a decoded-generation cache.
pub const T_BLACK: &str = "black";
pub const T_WHITE: &str = "white";
pub const T_SIDE: &str = "side";
pub const T_LEGAL_MASK: &str = "legal_mask";
pub const T_POLICY: &str = "policy";
pub const T_VALUE: &str = "value";

/// Metadata keys inside a decoded-generation cache.
pub const M_FORMAT_VERSION: &str = "record_format_version";
pub const M_SOURCE_LEN: &str = "source_len";
pub const M_SOURCE_BLAKE3: &str = "source_blake3";
pub const M_BOARD_SIZE: &str = "board_size";
pub const M_N_ACTIONS: &str = "n_actions";
pub const M_PREPROCESS: &str = "preprocess";
pub const M_RECORDS: &str = "records";
pub const M_DROPPED: &str = "dropped_records";
pub const M_DEDUP_INPUT: &str = "dedup_input";
pub const M_DEDUP_OUTPUT: &str = "dedup_output";
pub const M_DEDUP_MERGED: &str = "dedup_merged_groups";

//! om-replay: Self-play shard merge, sliding replay window, weighted minibatches.

pub mod cache;
pub mod clock;
pub mod codec;
pub mod error;
pub mod loader;
pub mod merge;
pub mod pool;
pub mod sampler;
pub mod schema;
pub mod window;
pub mod writer;

pub use cache::{read_cache, write_cache, CacheKey, CachedStats};
pub use clock::{CancelToken, Clock, ManualClock, SystemClock};
pub use codec::{
    CodecError, DecodedRecords, FormatError, GameRecord, InvariantViolation, RecordLayout,
};
pub use error::ReplayError;
pub use loader::{Phase, ReplayLoader};
pub use merge::{
    cache_path, cleanup_tmp_files, generation_path, shard_path, MergeOutcome, ShardMerger,
    ShardStatus,
};
pub use pool::{Resident, ResidentPool};
pub use sampler::{Minibatch, Sampler};
pub use window::{AdvanceReport, ReplayWindow, WindowOptions};
pub use writer::{ShardWriter, ShardWriterConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

#[cfg(test)]
mod test_util;




#[cfg(test)]
mod cache_tests;

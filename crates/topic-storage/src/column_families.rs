//! Column family definitions for RocksDB.
//!
//! - topics: topic records keyed by id
//! - topic_index: category -> topic id secondary index
//! - usage_history: append-only attempt log (per topic and per category timeline)
//! - similarity_blocks: near-duplicate pairs keyed by category and normalized pair
//! - leases: short-lived category leases

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family for topic records
pub const CF_TOPICS: &str = "topics";

/// Column family for the category secondary index
pub const CF_TOPIC_INDEX: &str = "topic_index";

/// Column family for usage history rows
pub const CF_USAGE_HISTORY: &str = "usage_history";

/// Column family for similarity blocks
pub const CF_SIMILARITY_BLOCKS: &str = "similarity_blocks";

/// Column family for category leases
pub const CF_LEASES: &str = "leases";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[
    CF_TOPICS,
    CF_TOPIC_INDEX,
    CF_USAGE_HISTORY,
    CF_SIMILARITY_BLOCKS,
    CF_LEASES,
];

/// Options for the append-only history column family
fn history_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    ALL_CF_NAMES
        .iter()
        .map(|&name| {
            let opts = if name == CF_USAGE_HISTORY {
                history_options()
            } else {
                Options::default()
            };
            ColumnFamilyDescriptor::new(name, opts)
        })
        .collect()
}

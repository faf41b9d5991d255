//! # refdb
//!
//! `refdb` tracks how many owners each stored object has in a deduplicating
//! object store. Objects are named by hex digests; once the last owner lets
//! go, the digest lands in the trash and the object may be reclaimed.
//!
//! ## Key Features
//!
//! * **Compact Trie**: Keys live in a 16-ary nibble trie backed by an arena.
//! * **Reference Counting**: Insert/delete adjust counts; zero retires the key.
//! * **Sharding**: 256 independent shards keyed by the first two digest symbols.
//! * **Persistence**: CRC-protected record stream per shard file.
//!
//! ## Example
//!
//! ```no_run
//! use refdb::{IndexOptions, ShardManager};
//!
//! # fn main() -> refdb::Result<()> {
//! let manager = ShardManager::new(IndexOptions::new("./refdb_data"))?;
//!
//! manager.add("A3F1C2")?;
//! manager.add("A3F1C2")?;
//! manager.delete("A3F1C2")?;
//! assert!(manager.get_trash().is_empty());
//!
//! manager.delete("A3F1C2")?;
//! assert_eq!(manager.get_trash(), vec!["A3F1C2"]);
//!
//! manager.save()?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod index;
mod record;
mod trie;
mod util;

pub mod sharded;
pub mod storage;

// Re-exports for the flat public API
pub use config::{CompressionType, IndexOptions, ReadStrategy, SaveMode};
pub use error::{Error, Result};
pub use index::{RefIndex, Selector, ZeroRefs};
pub use record::{RecordReader, RefRecord, write_record};
pub use sharded::{Shard, ShardManager};
pub use trie::PrefixTrie;
pub use util::ALPHABET;

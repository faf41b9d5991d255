//! # Sharded Index
//!
//! Splits the key space into 256 independent shards so that large key sets
//! load, save and mutate in parallel-friendly pieces.
//!
//! ## Architecture
//!
//! `ShardManager` owns one `Shard` per two-symbol key prefix (`00` .. `FF`).
//! Each shard is a complete, isolated `RefIndex` with its own lock, its own
//! file at `root/<namespace>/<id>/<file_name>`, and its own trash list.
//!
//! ## Limitations
//!
//! - **Fixed shard count**: 256, tied to the two-symbol prefix
//! - **No cross-shard transactions**: save and load stop at the first failing
//!   shard without rolling back the others
//! - **Single process**: nothing coordinates access to shard files across
//!   processes

mod manager;
mod router;
mod shard;

// Public API exports
pub use manager::ShardManager;
pub use router::{PREFIX_LEN, Router, SHARD_COUNT};
pub use shard::Shard;

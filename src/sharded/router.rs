//! Key-based routing to determine shard assignment.
//!
//! The shard of a key is named by its first two symbols, so routing needs no
//! hashing and is stable across restarts and across processes.

use crate::error::{Error, Result};
use crate::util;

/// Number of shards: one per two-symbol prefix.
pub const SHARD_COUNT: usize = 256;

/// Number of leading key symbols that select a shard.
pub const PREFIX_LEN: usize = 2;

/// Routes keys to shard IDs by their two-symbol prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Router;

impl Router {
  pub fn new() -> Self {
    Self
  }

  /// Routes a key to its shard ID in `0..256`.
  ///
  /// # Errors
  ///
  /// Returns `Error::ShardNotFound` if the key has fewer than two symbols or
  /// either of them is outside `0-9A-F`.
  #[inline]
  pub fn route(&self, key: &str) -> Result<u8> {
    let bytes = key.as_bytes();
    let slots = match bytes {
      [hi, lo, ..] => util::slot_of(*hi).zip(util::slot_of(*lo)),
      _ => None,
    };

    match slots {
      Some((hi, lo)) => Ok(hi << 4 | lo),
      None => Err(Error::ShardNotFound {
        key: key.to_string(),
        id: key.chars().take(PREFIX_LEN).collect(),
      }),
    }
  }

  /// Generates the directory name of a shard: `"00"` to `"FF"`.
  pub fn shard_name(&self, shard_id: u8) -> String {
    format!("{:02X}", shard_id)
  }

  /// Returns the total number of shards.
  pub fn shard_count(&self) -> usize {
    SHARD_COUNT
  }
}

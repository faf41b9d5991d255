//! ShardManager implementation - the main public API.

use crate::config::IndexOptions;
use crate::error::{Error, Result};
use crate::index::{Selector, ZeroRefs};
use crate::sharded::router::Router;
use crate::sharded::shard::Shard;
use crate::storage;
use crate::util;

use std::path::Path;

/// Reference counts for content digests, split across 256 shards.
///
/// Each key is routed by its first two symbols to one `Shard`, which owns an
/// independent index, lock, and file. Operations on different shards never
/// contend.
///
/// # Example
///
/// ```no_run
/// use refdb::{IndexOptions, ShardManager};
///
/// # fn main() -> refdb::Result<()> {
/// let manager = ShardManager::new(IndexOptions::new("/var/lib/blobs"))?;
/// manager.load()?;
///
/// manager.add("9F86D081884C7D659A2FEAA0C55AD015")?;
/// manager.delete("9F86D081884C7D659A2FEAA0C55AD015")?;
///
/// for key in manager.get_trash() {
///     println!("reclaim {}", key);
/// }
/// manager.save()?;
/// # Ok(())
/// # }
/// ```
pub struct ShardManager {
  options: IndexOptions,
  router: Router,
  shards: Vec<Shard>,
}

impl ShardManager {
  /// Creates all 256 shards, each rooted at
  /// `root_path/namespace/<shard id>/`.
  ///
  /// Nothing is read from disk; call `load` to restore saved state.
  ///
  /// # Errors
  ///
  /// Returns error if the options are invalid or the storage driver is
  /// unknown.
  pub fn new(options: IndexOptions) -> Result<Self> {
    options.validate()?;

    let router = Router::new();
    let shard_count = router.shard_count();
    let mut shards = Vec::with_capacity(shard_count);

    for shard_id in 0..shard_count {
      let name = router.shard_name(shard_id as u8);
      let dir = util::shard_dir(&options.root_path, &options.namespace, &name);
      let driver = storage::create(&options.driver, &dir, &options)?;
      shards.push(Shard::new(name, driver, &options));
    }

    Ok(Self {
      options,
      router,
      shards,
    })
  }

  pub fn options(&self) -> &IndexOptions {
    &self.options
  }

  pub fn root(&self) -> &Path {
    &self.options.root_path
  }

  /// Returns the shard responsible for `key`.
  pub fn shard_for(&self, key: &str) -> Result<&Shard> {
    let shard_id = self.router.route(key).inspect_err(|_| {
      tracing::error!(target: "refdb::shard", "Cannot find shard for key {}", key);
    })?;
    Ok(&self.shards[shard_id as usize])
  }

  /// Returns the shard with the given ID.
  pub fn shard(&self, shard_id: u8) -> &Shard {
    &self.shards[shard_id as usize]
  }

  /// All shards in ID order.
  pub fn shards(&self) -> impl Iterator<Item = &Shard> {
    self.shards.iter()
  }

  /// Takes one reference on `key`.
  pub fn add(&self, key: &str) -> Result<()> {
    self.shard_for(key)?.add(key)
  }

  /// Drops one reference on `key`. A key whose count reaches zero is moved
  /// to the trash of its shard.
  pub fn delete(&self, key: &str) -> Result<()> {
    self.shard_for(key)?.delete(key).inspect_err(|e| {
      tracing::error!(target: "refdb::shard", "Failed to delete {}: {}", key, e);
    })
  }

  pub fn get_ref(&self, key: &str) -> Result<i64> {
    self.shard_for(key)?.get_ref(key)
  }

  /// Sets the reference count of `key` directly.
  pub fn update(&self, key: &str, refs: i64) -> Result<()> {
    self.shard_for(key)?.update(key, refs)
  }

  /// Every retired key, shard by shard in ID order. Order within a shard is
  /// retirement order.
  pub fn get_trash(&self) -> Vec<String> {
    let mut trash = Vec::new();
    for shard in &self.shards {
      trash.extend(shard.get_trash());
    }
    trash
  }

  /// Runs `selector` over every shard in ID order.
  pub fn select<S: Selector + ?Sized>(&self, selector: &mut S) -> Result<()> {
    for shard in &self.shards {
      shard.select(selector)?;
    }
    Ok(())
  }

  /// Keys whose count is zero or below, typically forced there by `update`.
  pub fn zero_refs(&self) -> Result<Vec<String>> {
    let mut zero = ZeroRefs::default();
    self.select(&mut zero)?;
    Ok(zero.keys)
  }

  /// Saves every shard in ID order and returns the total record count.
  ///
  /// # Atomicity
  ///
  /// None across shards. The first failing shard aborts the save; shards
  /// saved before it keep their new files.
  pub fn save(&self) -> Result<u64> {
    let mut total = 0;
    for shard in &self.shards {
      total += shard.save().map_err(|e| wrap(shard, e))?;
    }
    tracing::debug!(target: "refdb::shard", "Saved {} records across {} shards", total, self.shards.len());
    Ok(total)
  }

  /// Loads every shard in ID order and returns the total record count.
  ///
  /// The first failing shard aborts the load. The manager should then be
  /// discarded, since shards before it are already populated.
  pub fn load(&self) -> Result<u64> {
    let mut total = 0;
    for shard in &self.shards {
      total += shard.load().map_err(|e| wrap(shard, e))?;
    }
    tracing::debug!(target: "refdb::shard", "Loaded {} records across {} shards", total, self.shards.len());
    Ok(total)
  }

  /// Releases the index of every shard. Returns the number of keys released.
  pub fn cleanup(&self) -> usize {
    self.shards.iter().map(Shard::cleanup).sum()
  }

  /// Total number of keys across all shards.
  pub fn len(&self) -> usize {
    self.shards.iter().map(Shard::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.shards.iter().all(Shard::is_empty)
  }
}

fn wrap(shard: &Shard, e: Error) -> Error {
  Error::Shard {
    shard: shard.id().to_string(),
    source: Box::new(e),
  }
}

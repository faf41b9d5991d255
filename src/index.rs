//! Reference-counted key index.
//!
//! `RefIndex` wraps one `PrefixTrie<i64>` behind a single mutex. Every
//! operation holds the lock for its whole duration, including `save`,
//! `load` and `select`.

use crate::error::{Error, Result};
use crate::record::{self, RecordReader};
use crate::trie::PrefixTrie;
use parking_lot::Mutex;
use std::io::{Read, Write};

/// Filters and receives entries during `RefIndex::select`.
///
/// Both methods run while the index lock is held; they must not call back
/// into the same index.
pub trait Selector {
  fn check(&self, key: &str, refs: i64) -> bool;

  fn collect(&mut self, key: &str, refs: i64) -> Result<()>;
}

/// Collects every key whose reference count is zero or below.
#[derive(Debug, Default)]
pub struct ZeroRefs {
  pub keys: Vec<String>,
}

impl Selector for ZeroRefs {
  fn check(&self, _key: &str, refs: i64) -> bool {
    refs <= 0
  }

  fn collect(&mut self, key: &str, _refs: i64) -> Result<()> {
    self.keys.push(key.to_string());
    Ok(())
  }
}

/// Thread-safe reference counts keyed by hex digest prefixes.
pub struct RefIndex {
  inner: Mutex<PrefixTrie<i64>>,
}

impl RefIndex {
  /// Creates an empty index.
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(PrefixTrie::new()),
    }
  }

  /// Takes one more reference on `key`, creating it with a count of 1.
  pub fn insert(&self, key: &str) -> Result<()> {
    let mut trie = self.inner.lock();
    if let Some(refs) = trie.get_mut(key) {
      *refs += 1;
      return Ok(());
    }
    trie.put(key, 1)?;
    Ok(())
  }

  /// Returns the reference count of `key`.
  pub fn get_ref(&self, key: &str) -> Result<i64> {
    self
      .inner
      .lock()
      .get(key)
      .copied()
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }

  /// Sets the reference count of `key` directly, creating it if absent.
  pub fn update(&self, key: &str, refs: i64) -> Result<()> {
    let mut trie = self.inner.lock();
    if let Some(current) = trie.get_mut(key) {
      *current = refs;
      return Ok(());
    }
    trie.put(key, refs)?;
    Ok(())
  }

  /// Drops one reference on `key`.
  ///
  /// Returns `true` only when this call retired the key, i.e. its count
  /// reached zero and it was removed. Absent keys are a no-op.
  pub fn delete(&self, key: &str) -> Result<bool> {
    let mut trie = self.inner.lock();
    let Some(refs) = trie.get_mut(key) else {
      return Ok(false);
    };

    *refs -= 1;
    if *refs > 0 {
      return Ok(false);
    }

    Ok(trie.delete(key))
  }

  /// Offers every entry to `selector` in walk order, collecting those it
  /// accepts. The index is not modified.
  pub fn select<S: Selector + ?Sized>(&self, selector: &mut S) -> Result<()> {
    let trie = self.inner.lock();
    trie.walk(|key, &refs| {
      if selector.check(key, refs) {
        selector.collect(key, refs)?;
      }
      Ok(())
    })
  }

  /// Writes one record per entry to `sink` in walk order.
  ///
  /// Returns the number of records written. `sink` is not flushed.
  pub fn save<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64> {
    let trie = self.inner.lock();
    let mut written = 0u64;
    trie.walk(|key, &refs| {
      record::write_record(&mut *sink, key, refs)?;
      written += 1;
      Ok(())
    })?;
    Ok(written)
  }

  /// Reads records from `source` until it ends, upserting each one.
  /// A later record for the same key replaces an earlier one.
  ///
  /// On failure every entry is released, so a half-loaded index is never
  /// observable. Returns the number of records applied.
  pub fn load<R: Read>(&self, source: R) -> Result<u64> {
    let mut trie = self.inner.lock();
    let mut reader = RecordReader::new(source);
    let mut applied = 0u64;

    loop {
      let record = match reader.next_record() {
        Ok(Some(record)) => record,
        Ok(None) => break,
        Err(e) => {
          let released = trie.free_all();
          tracing::warn!(
            target: "refdb",
            "Load aborted at offset {} after {} records, released {} keys: {}",
            reader.offset(),
            applied,
            released,
            e
          );
          return Err(e);
        }
      };

      match trie.get_mut(&record.key) {
        Some(refs) => *refs = record.refs,
        None => {
          trie.put(&record.key, record.refs)?;
        }
      }
      applied += 1;
    }

    Ok(applied)
  }

  /// Releases every entry at once. The index is empty afterwards.
  pub fn cleanup(&self) -> usize {
    self.inner.lock().free_all()
  }

  /// Number of keys currently tracked.
  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  /// Returns true if no key is tracked.
  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }
}

impl Default for RefIndex {
  fn default() -> Self {
    Self::new()
  }
}

#![allow(dead_code)]

use rand::{Rng, rng};
use refdb::{ALPHABET, IndexOptions, ShardManager};
use std::collections::HashSet;
use tempfile::TempDir;

pub struct TestEnv {
  pub manager: ShardManager,
  pub options: IndexOptions,
  // The TempDir guard must be kept alive to prevent premature deletion of the directory.
  pub _dir: TempDir,
  pub root: std::path::PathBuf,
}

impl TestEnv {
  pub fn new(mut options: IndexOptions) -> Self {
    let dir = tempfile::tempdir().unwrap();
    options.root_path = dir.path().to_path_buf();
    let root = options.root_path.clone();

    let manager = ShardManager::new(options.clone()).unwrap();

    Self {
      manager,
      options,
      _dir: dir,
      root,
    }
  }

  pub fn with_default() -> Self {
    Self::new(IndexOptions::default())
  }

  /// Simulates a restart: drops the current manager and loads a fresh one
  /// from the same directory.
  pub fn restart(&mut self) {
    self.manager = ShardManager::new(self.options.clone()).unwrap();
    self.manager.load().unwrap();
  }
}

/// A random key of `len` symbols from the index alphabet.
pub fn random_key(len: usize) -> String {
  let mut rng = rng();
  (0..len)
    .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
    .collect()
}

/// `count` distinct random keys of `len` symbols.
pub fn distinct_keys(count: usize, len: usize) -> Vec<String> {
  let mut seen = HashSet::with_capacity(count);
  let mut keys = Vec::with_capacity(count);
  while keys.len() < count {
    let key = random_key(len);
    if seen.insert(key.clone()) {
      keys.push(key);
    }
  }
  keys
}

//! Byte-stream storage used to persist shard files.
//!
//! A `StorageDriver` hands out sequential writers and readers for file names
//! relative to its root. Only the filesystem driver ships with the crate;
//! `create` resolves a driver by name.

mod filesystem;

pub use filesystem::{FileSystem, FileWriter};

use crate::config::IndexOptions;
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

/// A writer that must end in exactly one of `close` or `cancel`.
pub trait StorageWriter: Write + Send {
  /// Flushes buffered data and forces it to durable storage.
  fn commit(&mut self) -> Result<()>;

  /// Aborts the write and removes everything this writer produced.
  fn cancel(self: Box<Self>) -> Result<()>;

  /// Commits and releases the underlying file.
  fn close(self: Box<Self>) -> Result<()>;
}

pub trait StorageDriver: Send + Sync {
  fn name(&self) -> &'static str;

  /// Opens `file` for writing. With `append` the writer continues at the
  /// current end of the file, otherwise its output replaces the file only
  /// once the writer is closed.
  fn writer(&self, file: &str, append: bool) -> Result<Box<dyn StorageWriter>>;

  /// Opens `file` for sequential reading from byte `offset`.
  fn reader(&self, file: &str, offset: u64) -> Result<Box<dyn Read + Send>>;

  /// Returns true if `file` exists.
  fn exists(&self, file: &str) -> Result<bool>;
}

/// Builds the driver registered under `name`, rooted at `root`.
pub fn create(name: &str, root: &Path, options: &IndexOptions) -> Result<Box<dyn StorageDriver>> {
  match name {
    FileSystem::NAME => Ok(Box::new(FileSystem::new(root, options))),
    other => Err(Error::Config(format!("Unknown storage driver: {:?}", other))),
  }
}

use crate::error::{Error, Result};
use crate::util;
use std::path::PathBuf;

/// Defines how `save` treats the existing content of a shard file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
  /// Truncate the file and write a fresh snapshot.
  Truncate,

  /// Append a full snapshot after the existing content. On load, later
  /// records for the same key override earlier ones, but keys retired
  /// since an earlier save are still present in the older records.
  Append,
}

/// Defines the strategy used for reading shard files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
  /// Uses buffered `File::read`.
  StandardIo,

  /// Memory-maps the shard file for the duration of the load.
  /// The file must not be modified while it is mapped.
  Mmap,
}

/// Defines the compression applied to the record stream of a shard file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
  /// Records are written as-is.
  None,

  /// Records are wrapped in LZ4 frames. Appended snapshots form a valid
  /// concatenation of frames.
  #[cfg(feature = "compression")]
  Lz4,
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
  /// Base directory of the store.
  pub root_path: PathBuf,

  /// Sub-directory below `root_path` holding the 256 shard directories.
  /// Default: "sha256".
  pub namespace: String,

  /// Name of the file inside every shard directory.
  /// Default: "db".
  pub file_name: String,

  /// Storage driver resolved through `storage::create`.
  /// Default: "filesystem".
  pub driver: String,

  // --- Behavior ---
  pub save_mode: SaveMode,
  pub read_strategy: ReadStrategy,
  pub compression: CompressionType,

  // --- Resources ---
  /// Size of the in-memory write buffer of a shard writer.
  /// Default: 64 KB.
  pub write_buffer_size: usize,

  /// Size of the buffer used when reading a shard file.
  /// Default: 128 KB.
  pub read_buffer_size: usize,
}

impl Default for IndexOptions {
  fn default() -> Self {
    Self {
      root_path: PathBuf::from("./refdb_data"),
      namespace: "sha256".to_string(),
      file_name: "db".to_string(),
      driver: "filesystem".to_string(),
      save_mode: SaveMode::Truncate,
      read_strategy: ReadStrategy::StandardIo,
      compression: CompressionType::None,
      write_buffer_size: 64 * 1024, // 64 KB
      read_buffer_size: 128 * 1024, // 128 KB
    }
  }
}

impl IndexOptions {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      root_path: path.into(),
      ..Default::default()
    }
  }

  pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
    self.file_name = file_name.into();
    self
  }

  pub fn validate(&self) -> Result<()> {
    util::validate_component("namespace", &self.namespace)?;
    util::validate_component("file name", &self.file_name)?;

    if self.write_buffer_size == 0 {
      return Err(Error::Config("write_buffer_size must be greater than zero".into()));
    }
    if self.read_buffer_size == 0 {
      return Err(Error::Config("read_buffer_size must be greater than zero".into()));
    }

    Ok(())
  }
}

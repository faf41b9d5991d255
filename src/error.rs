use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  #[error("I/O Error: {0}")]
  Io(#[from] io::Error),

  #[error("Cannot access {}: {source}", path.display())]
  File {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Corrupt record at offset {offset}: {reason}")]
  CorruptRecord { offset: u64, reason: String },

  #[error("Key not found: {0}")]
  NotFound(String),

  #[error("No shard {id:?} for key {key:?}")]
  ShardNotFound { key: String, id: String },

  #[error("Invalid key {key:?}: {reason}")]
  InvalidKey { key: String, reason: String },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Shard {shard} failed: {source}")]
  Shard {
    shard: String,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  /// Strips any `Shard` wrappers and returns the underlying failure.
  pub fn root_cause(&self) -> &Error {
    match self {
      Error::Shard { source, .. } => source.root_cause(),
      other => other,
    }
  }
}

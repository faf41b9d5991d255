//! One persistent partition of the index.

use crate::config::{CompressionType, IndexOptions, SaveMode};
use crate::error::Result;
use crate::index::{RefIndex, Selector};
use crate::storage::{self, StorageDriver, StorageWriter};

use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;

#[cfg(feature = "compression")]
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
#[cfg(feature = "compression")]
use std::io::{self, BufRead, BufReader};

/// A `RefIndex` bound to one file, plus the keys it retired since it was
/// opened.
pub struct Shard {
  id: String,
  index: RefIndex,
  driver: Box<dyn StorageDriver>,
  file_name: String,
  save_mode: SaveMode,
  compression: CompressionType,
  /// Keys whose count reached zero, in retirement order.
  trash: Mutex<Vec<String>>,
}

impl Shard {
  pub fn new(id: impl Into<String>, driver: Box<dyn StorageDriver>, options: &IndexOptions) -> Self {
    Self {
      id: id.into(),
      index: RefIndex::new(),
      driver,
      file_name: options.file_name.clone(),
      save_mode: options.save_mode,
      compression: options.compression,
      trash: Mutex::new(Vec::new()),
    }
  }

  /// Creates a standalone shard whose file lives directly under `root`.
  pub fn open(id: impl Into<String>, root: &Path, options: &IndexOptions) -> Result<Self> {
    options.validate()?;
    let driver = storage::create(&options.driver, root, options)?;
    Ok(Self::new(id, driver, options))
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn add(&self, key: &str) -> Result<()> {
    self.index.insert(key)
  }

  /// Drops one reference on `key`, moving it to the trash once retired.
  pub fn delete(&self, key: &str) -> Result<()> {
    // Held across the index call so trash order is retirement order.
    let mut trash = self.trash.lock();
    if self.index.delete(key)? {
      trash.push(key.to_string());
    }
    Ok(())
  }

  /// Keys retired since this shard was opened.
  pub fn get_trash(&self) -> Vec<String> {
    self.trash.lock().clone()
  }

  pub fn get_ref(&self, key: &str) -> Result<i64> {
    self.index.get_ref(key)
  }

  pub fn update(&self, key: &str, refs: i64) -> Result<()> {
    self.index.update(key, refs)
  }

  pub fn select<S: Selector + ?Sized>(&self, selector: &mut S) -> Result<()> {
    self.index.select(selector)
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  /// Releases every entry of the index. The trash is kept.
  pub fn cleanup(&self) -> usize {
    self.index.cleanup()
  }

  /// Persists the index to the shard file.
  ///
  /// The writer is closed on success and canceled on failure, so a failed
  /// save leaves no partial snapshot behind. Returns the number of records
  /// written.
  pub fn save(&self) -> Result<u64> {
    let append = self.save_mode == SaveMode::Append;
    let mut writer = self.driver.writer(&self.file_name, append)?;

    match self.write_records(writer.as_mut()) {
      Ok(count) => {
        if let Err(e) = writer.close() {
          tracing::error!(target: "refdb::shard", "Failed to close {} of shard {}: {}", self.file_name, self.id, e);
          return Err(e);
        }
        tracing::debug!(target: "refdb::shard", "Saved {} records to {} of shard {}", count, self.file_name, self.id);
        Ok(count)
      }
      Err(e) => {
        tracing::error!(target: "refdb::shard", "Failed to save {} of shard {}: {}", self.file_name, self.id, e);
        if let Err(cancel_err) = writer.cancel() {
          tracing::warn!(
            target: "refdb::shard",
            "Failed to cancel {} of shard {}: {}",
            self.file_name,
            self.id,
            cancel_err
          );
        }
        Err(e)
      }
    }
  }

  /// Loads the shard file into the index.
  ///
  /// A shard that was never saved has no file and loads as empty. Returns
  /// the number of records applied.
  pub fn load(&self) -> Result<u64> {
    if !self.driver.exists(&self.file_name)? {
      tracing::debug!(target: "refdb::shard", "No {} for shard {}, starting empty", self.file_name, self.id);
      return Ok(0);
    }

    let reader = self.driver.reader(&self.file_name, 0)?;
    match self.read_records(reader) {
      Ok(count) => {
        tracing::debug!(target: "refdb::shard", "Loaded {} records from {} of shard {}", count, self.file_name, self.id);
        Ok(count)
      }
      Err(e) => {
        tracing::error!(target: "refdb::shard", "Failed to load {} of shard {}: {}", self.file_name, self.id, e);
        Err(e)
      }
    }
  }

  fn write_records(&self, writer: &mut dyn StorageWriter) -> Result<u64> {
    match self.compression {
      CompressionType::None => self.index.save(writer),
      #[cfg(feature = "compression")]
      CompressionType::Lz4 => {
        let mut encoder = FrameEncoder::new(writer);
        let count = self.index.save(&mut encoder)?;
        encoder.finish().map_err(io::Error::other)?;
        Ok(count)
      }
    }
  }

  fn read_records(&self, reader: Box<dyn Read + Send>) -> Result<u64> {
    match self.compression {
      CompressionType::None => self.index.load(reader),
      #[cfg(feature = "compression")]
      CompressionType::Lz4 => self.index.load(Lz4Frames::new(reader)),
    }
  }
}

/// Decodes a sequence of LZ4 frames as one stream. Every save in append
/// mode adds a frame, and a single `FrameDecoder` stops after the first.
#[cfg(feature = "compression")]
struct Lz4Frames<R: Read> {
  decoder: Option<FrameDecoder<BufReader<R>>>,
}

#[cfg(feature = "compression")]
impl<R: Read> Lz4Frames<R> {
  fn new(inner: R) -> Self {
    Self {
      decoder: Some(FrameDecoder::new(BufReader::new(inner))),
    }
  }
}

#[cfg(feature = "compression")]
impl<R: Read> Read for Lz4Frames<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }

    loop {
      let Some(decoder) = self.decoder.as_mut() else {
        return Ok(0);
      };

      let n = decoder.read(buf)?;
      if n > 0 {
        return Ok(n);
      }

      // End of a frame. Another one follows only if bytes remain.
      let Some(decoder) = self.decoder.take() else {
        return Ok(0);
      };
      let mut inner = decoder.into_inner();
      if inner.fill_buf()?.is_empty() {
        return Ok(0);
      }
      self.decoder = Some(FrameDecoder::new(inner));
    }
  }
}

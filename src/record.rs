//! Binary format for persisted `(key, ref)` records.
//!
//! A shard file is a plain sequence of records with no file header, so a
//! snapshot appended to an existing file is still a valid stream.
//!
//! ## Binary Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ MAGIC          │ 4 bytes  │ "RREC"                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ CRC32          │ 4 bytes  │ Checksum of KEY_LEN, REF, KEY   │
//! ├─────────────────────────────────────────────────────────────┤
//! │ KEY_LEN        │ 4 bytes  │ Length of KEY (u32 LE)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ REF            │ 8 bytes  │ Reference count (i64 LE)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │ KEY            │ N bytes  │ Symbols from 0-9A-F             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{Error, Result};
use crate::util;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use std::io::{self, Read, Write};

/// Magic bytes opening every record: "RREC"
pub const MAGIC: &[u8; 4] = b"RREC";

/// MAGIC + CRC + KEY_LEN + REF
pub const HEADER_SIZE: usize = 4 + 4 + 4 + 8; // 20 bytes

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRecord {
  pub key: String,
  pub refs: i64,
}

impl RefRecord {
  pub fn new(key: impl Into<String>, refs: i64) -> Self {
    Self { key: key.into(), refs }
  }
}

/// Encodes one record into `writer`.
pub fn write_record<W: Write + ?Sized>(writer: &mut W, key: &str, refs: i64) -> Result<()> {
  if key.len() > util::MAX_KEY_LEN {
    return Err(Error::InvalidKey {
      key: key.to_string(),
      reason: format!("key too long: {} bytes (max: {})", key.len(), util::MAX_KEY_LEN),
    });
  }

  let key_len = key.len() as u32;
  let crc = checksum(key_len, refs, key.as_bytes());

  let mut buf = Vec::with_capacity(HEADER_SIZE + key.len());
  buf.write_all(MAGIC)?;
  buf.write_u32::<LittleEndian>(crc)?;
  buf.write_u32::<LittleEndian>(key_len)?;
  buf.write_i64::<LittleEndian>(refs)?;
  buf.write_all(key.as_bytes())?;

  writer.write_all(&buf)?;
  Ok(())
}

/// Streams records out of a reader, tracking the byte offset of each one
/// for error reporting.
pub struct RecordReader<R> {
  inner: R,
  offset: u64,
}

impl<R: Read> RecordReader<R> {
  pub fn new(inner: R) -> Self {
    Self { inner, offset: 0 }
  }

  /// Byte offset of the next record.
  pub fn offset(&self) -> u64 {
    self.offset
  }

  /// Reads the next record.
  ///
  /// Returns `Ok(None)` only when the stream ends exactly on a record
  /// boundary. A partial record is reported as corruption.
  pub fn next_record(&mut self) -> Result<Option<RefRecord>> {
    let start = self.offset;

    let mut magic = [0u8; 4];
    let filled = self.fill(&mut magic)?;
    if filled == 0 {
      return Ok(None);
    }
    if filled < magic.len() {
      return Err(corrupt(start, format!("Truncated MAGIC: {} of 4 bytes", filled)));
    }
    if &magic != MAGIC {
      return Err(corrupt(start, format!("Invalid MAGIC: expected {:?}, got {:?}", MAGIC, magic)));
    }

    let stored_crc = self.inner.read_u32::<LittleEndian>().map_err(|e| read_failure(start, "CRC", e))?;
    let key_len = self
      .inner
      .read_u32::<LittleEndian>()
      .map_err(|e| read_failure(start, "KEY_LEN", e))?;
    let refs = self.inner.read_i64::<LittleEndian>().map_err(|e| read_failure(start, "REF", e))?;

    // Sized by what the stream delivers, not by an unchecked KEY_LEN.
    let mut key = Vec::new();
    let got = Read::by_ref(&mut self.inner)
      .take(key_len as u64)
      .read_to_end(&mut key)
      .map_err(|e| read_failure(start, "KEY", e))?;
    if got < key_len as usize {
      return Err(corrupt(start, format!("Truncated KEY: {} of {} bytes", got, key_len)));
    }

    let computed_crc = checksum(key_len, refs, &key);
    if computed_crc != stored_crc {
      return Err(corrupt(
        start,
        format!("CRC mismatch: expected {:#x}, got {:#x}", stored_crc, computed_crc),
      ));
    }

    let key = String::from_utf8(key).map_err(|e| corrupt(start, format!("Key is not UTF-8: {}", e)))?;
    util::validate_key(&key).map_err(|e| corrupt(start, e.to_string()))?;

    self.offset = start + HEADER_SIZE as u64 + key_len as u64;
    Ok(Some(RefRecord { key, refs }))
  }

  /// Fills `buf` as far as the stream allows and returns the byte count.
  fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
      match self.inner.read(&mut buf[filled..]) {
        Ok(0) => break,
        Ok(n) => filled += n,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(read_failure(self.offset, "MAGIC", e)),
      }
    }
    Ok(filled)
  }
}

impl<R: Read> Iterator for RecordReader<R> {
  type Item = Result<RefRecord>;

  fn next(&mut self) -> Option<Self::Item> {
    self.next_record().transpose()
  }
}

fn checksum(key_len: u32, refs: i64, key: &[u8]) -> u32 {
  let mut hasher = Hasher::new();
  hasher.update(&key_len.to_le_bytes());
  hasher.update(&refs.to_le_bytes());
  hasher.update(key);
  hasher.finalize()
}

fn corrupt(offset: u64, reason: String) -> Error {
  Error::CorruptRecord { offset, reason }
}

/// Short reads and undecodable input are corruption; everything else is a
/// genuine I/O failure of the underlying source.
fn read_failure(offset: u64, field: &str, e: io::Error) -> Error {
  match e.kind() {
    io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
      corrupt(offset, format!("Failed to read {}: {}", field, e))
    }
    _ => Error::Io(e),
  }
}

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// The fixed key alphabet. A symbol's position is its child slot in the trie.
pub const ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Number of child slots per trie node.
pub const FANOUT: usize = ALPHABET.len();

/// Longest key the record format can encode (KEY_LEN is a u32).
pub const MAX_KEY_LEN: usize = u32::MAX as usize;

/// Maps a key symbol to its slot, or `None` if it is outside the alphabet.
#[inline]
pub fn slot_of(symbol: u8) -> Option<u8> {
  match symbol {
    b'0'..=b'9' => Some(symbol - b'0'),
    b'A'..=b'F' => Some(symbol - b'A' + 10),
    _ => None,
  }
}

/// Maps a slot back to its key symbol.
#[inline]
pub fn symbol_of(slot: u8) -> char {
  ALPHABET[slot as usize] as char
}

/// Checks that a key is non-empty, encodable, and uses only alphabet
/// symbols.
pub fn validate_key(key: &str) -> Result<()> {
  if key.is_empty() {
    return Err(Error::InvalidKey {
      key: key.to_string(),
      reason: "key cannot be empty".into(),
    });
  }

  if key.len() > MAX_KEY_LEN {
    return Err(Error::InvalidKey {
      key: key.chars().take(16).collect(),
      reason: format!("key too long: {} bytes (max: {})", key.len(), MAX_KEY_LEN),
    });
  }

  if let Some(pos) = key.bytes().position(|b| slot_of(b).is_none()) {
    return Err(Error::InvalidKey {
      key: key.to_string(),
      reason: format!("symbol at position {} is outside 0-9A-F", pos),
    });
  }

  Ok(())
}

/// Checks that `name` is a single, plain path component usable as a file or
/// directory name below the store root.
pub fn validate_component(what: &str, name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::Config(format!("{} cannot be empty", what)));
  }

  if name.contains(['/', '\\', ':', '\0']) {
    return Err(Error::Config(format!("{} must not contain path separators: {:?}", what, name)));
  }

  if name == "." || name == ".." {
    return Err(Error::Config(format!("Invalid {}: {:?}", what, name)));
  }

  Ok(())
}

/// Joins a relative file path onto `root`, refusing anything that could
/// escape it.
pub fn ensure_safe_path(root: &Path, child: &str) -> Result<PathBuf> {
  let child = Path::new(child);

  if child
    .components()
    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
  {
    return Err(Error::Config(format!("Path escapes storage root: {}", child.display())));
  }

  Ok(root.join(child))
}

/// Directory holding one shard's files: `root/<namespace>/<id>`.
pub fn shard_dir(root: &Path, namespace: &str, shard_name: &str) -> PathBuf {
  root.join(namespace).join(shard_name)
}

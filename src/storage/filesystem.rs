use crate::config::{IndexOptions, ReadStrategy};
use crate::error::{Error, Result};
use crate::storage::{StorageDriver, StorageWriter};
use crate::util;

use memmap2::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Stores files below a root directory on the local filesystem.
pub struct FileSystem {
  root: PathBuf,
  write_buffer_size: usize,
  read_buffer_size: usize,
  read_strategy: ReadStrategy,
}

impl FileSystem {
  pub const NAME: &'static str = "filesystem";

  pub fn new(root: impl Into<PathBuf>, options: &IndexOptions) -> Self {
    Self {
      root: root.into(),
      write_buffer_size: options.write_buffer_size,
      read_buffer_size: options.read_buffer_size,
      read_strategy: options.read_strategy,
    }
  }

  fn full_path(&self, file: &str) -> Result<PathBuf> {
    util::ensure_safe_path(&self.root, file)
  }
}

impl StorageDriver for FileSystem {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn writer(&self, file: &str, append: bool) -> Result<Box<dyn StorageWriter>> {
    let path = self.full_path(file)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|source| Error::File {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    // A fresh snapshot goes to a temp file first, so the previous one
    // survives until `close` renames over it.
    let (mut fp, temp_path) = if append {
      let fp = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| Error::File {
          path: path.clone(),
          source,
        })?;
      (fp, None)
    } else {
      let temp_path = temp_path_for(&path);
      let fp = File::create(&temp_path).map_err(|source| Error::File {
        path: temp_path.clone(),
        source,
      })?;
      (fp, Some(temp_path))
    };

    let start_offset = if append { fp.seek(SeekFrom::End(0))? } else { 0 };

    tracing::trace!(target: "refdb::storage", "Opened {} for writing at offset {}", path.display(), start_offset);

    Ok(Box::new(FileWriter {
      path,
      temp_path,
      inner: BufWriter::with_capacity(self.write_buffer_size, fp),
      start_offset,
      written: 0,
    }))
  }

  fn reader(&self, file: &str, offset: u64) -> Result<Box<dyn Read + Send>> {
    let path = self.full_path(file)?;
    let mut fp = File::open(&path).map_err(|source| Error::File {
      path: path.clone(),
      source,
    })?;

    let len = fp.metadata()?.len();
    if offset > len {
      return Err(Error::File {
        path,
        source: io::Error::new(
          io::ErrorKind::InvalidInput,
          format!("offset {} is beyond the end of the file ({} bytes)", offset, len),
        ),
      });
    }

    // Mapping a zero-length file fails on some platforms.
    if self.read_strategy == ReadStrategy::Mmap && len > 0 {
      // Safety: shard files are owned by this process; the caller must
      // ensure nothing else modifies the file while it is mapped.
      let map = unsafe { Mmap::map(&fp)? };
      return Ok(Box::new(FileReader::Mmap {
        map,
        pos: offset as usize,
      }));
    }

    fp.seek(SeekFrom::Start(offset))?;
    Ok(Box::new(FileReader::Io(BufReader::with_capacity(self.read_buffer_size, fp))))
  }

  fn exists(&self, file: &str) -> Result<bool> {
    let path = self.full_path(file)?;
    path.try_exists().map_err(|source| Error::File { path, source })
  }
}

fn temp_path_for(path: &Path) -> PathBuf {
  let mut temp = path.as_os_str().to_os_string();
  temp.push(".tmp");
  PathBuf::from(temp)
}

/// Buffered writer over one file.
pub struct FileWriter {
  path: PathBuf,
  /// Set when writing a fresh snapshot; renamed onto `path` by `close`.
  temp_path: Option<PathBuf>,
  inner: BufWriter<File>,
  /// File length when this writer was opened.
  start_offset: u64,
  written: u64,
}

impl Write for FileWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let n = self.inner.write(buf)?;
    self.written += n as u64;
    Ok(n)
  }

  fn flush(&mut self) -> io::Result<()> {
    self.inner.flush()
  }
}

impl StorageWriter for FileWriter {
  fn commit(&mut self) -> Result<()> {
    self.inner.flush()?;
    self.inner.get_ref().sync_all()?;
    Ok(())
  }

  fn cancel(self: Box<Self>) -> Result<()> {
    let FileWriter {
      path,
      temp_path,
      inner,
      start_offset,
      ..
    } = *self;

    // Buffered bytes are discarded, never written.
    let (file, _) = inner.into_parts();

    if let Some(temp_path) = temp_path {
      // The previous snapshot at `path` was never touched.
      drop(file);
      return remove_if_exists(temp_path);
    }

    if start_offset > 0 {
      // Appending to earlier content: cut back to where we started.
      file.set_len(start_offset)?;
      file.sync_all()?;
      return Ok(());
    }

    drop(file);
    remove_if_exists(path)
  }

  fn close(mut self: Box<Self>) -> Result<()> {
    self.commit()?;

    if let Some(temp_path) = self.temp_path.take() {
      fs::rename(&temp_path, &self.path).map_err(|source| Error::File {
        path: self.path.clone(),
        source,
      })?;

      // fsync the parent directory so the rename is persisted
      if let Some(parent) = self.path.parent() {
        File::open(parent)?.sync_all()?;
      }
    }

    tracing::trace!(target: "refdb::storage", "Closed {} after {} bytes", self.path.display(), self.written);
    Ok(())
  }
}

fn remove_if_exists(path: PathBuf) -> Result<()> {
  match fs::remove_file(&path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(Error::File { path, source }),
  }
}

/// Sequential reader over one file.
enum FileReader {
  Io(BufReader<File>),
  Mmap { map: Mmap, pos: usize },
}

impl Read for FileReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    match self {
      Self::Io(reader) => reader.read(buf),
      Self::Mmap { map, pos } => {
        let remaining = map.len().saturating_sub(*pos);
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&map[*pos..*pos + n]);
        *pos += n;
        Ok(n)
      }
    }
  }
}

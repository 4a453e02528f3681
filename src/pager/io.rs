// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The pager: a thin abstraction over one database file.
//!
//! Supports seek, tell, read, write, append-at-end, and an atomic swap of
//! the underlying handle (used by vacuum, which replaces the file wholesale
//! and re-installs a fresh handle without disturbing anyone holding the
//! shared pager). Read-only opens map the file into memory; writable opens
//! use the plain file cursor for both directions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use memmap2::Mmap;

use crate::data::reference::DataInner;
use crate::error::{io_error, ReedResult};

/// Shared handle to a pager. The engine is single-threaded, so plain
/// reference counting with interior mutability is sufficient.
pub type SharedPager = Rc<RefCell<Pager>>;

/// One open database file.
#[derive(Debug)]
pub struct Pager {
    path: PathBuf,
    file: File,
    map: Option<Mmap>,
    pos: u64,
    read_only: bool,
    intern: HashMap<u64, Weak<RefCell<DataInner>>>,
}

impl Pager {
    /// Opens an existing file for reading and writing.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> ReedResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_error("open", path.to_string_lossy(), e.to_string()))?;

        Ok(Self {
            path,
            file,
            map: None,
            pos: 0,
            read_only: false,
            intern: HashMap::new(),
        })
    }

    /// Opens an existing file read-only, backing reads with a memory
    /// mapping.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> ReedResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|e| io_error("open", path.to_string_lossy(), e.to_string()))?;

        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| io_error("mmap", path.to_string_lossy(), e.to_string()))?;

        Ok(Self {
            path,
            file,
            map: Some(map),
            pos: 0,
            read_only: true,
            intern: HashMap::new(),
        })
    }

    /// Creates (or truncates) a file for writing. Used for the initial
    /// database file and for the vacuum output.
    pub fn create<P: AsRef<Path>>(path: P) -> ReedResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| io_error("create", path.to_string_lossy(), e.to_string()))?;

        Ok(Self {
            path,
            file,
            map: None,
            pos: 0,
            read_only: false,
            intern: HashMap::new(),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this pager was opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Seeks to an absolute offset, returning it.
    pub fn seek_to(&mut self, offset: u64) -> ReedResult<u64> {
        self.seek(SeekFrom::Start(offset))
            .map_err(|e| io_error("seek", self.path.to_string_lossy(), e.to_string()))
    }

    /// Seeks to the end of the file, returning the offset there. New
    /// records are appended at the position this returns.
    pub fn seek_end(&mut self) -> ReedResult<u64> {
        self.seek(SeekFrom::End(0))
            .map_err(|e| io_error("seek", self.path.to_string_lossy(), e.to_string()))
    }

    /// Current position.
    pub fn tell(&mut self) -> ReedResult<u64> {
        self.seek(SeekFrom::Current(0))
            .map_err(|e| io_error("tell", self.path.to_string_lossy(), e.to_string()))
    }

    /// Replaces the underlying handle after vacuum rewrote the file. The
    /// old handle is closed, the position resets, and the intern table is
    /// emptied (offsets of the old file mean nothing in the new one).
    pub(crate) fn swap(&mut self, file: File) {
        self.file = file;
        self.map = None;
        self.pos = 0;
        self.intern.clear();
    }

    /// Closes the pager by consuming it.
    pub fn close(self) -> ReedResult<()> {
        Ok(())
    }

    /// Looks up a live interned reference for an offset. Entries whose
    /// referent has been dropped are removed on the way.
    pub(crate) fn intern_lookup(&mut self, offset: u64) -> Option<Rc<RefCell<DataInner>>> {
        match self.intern.get(&offset) {
            Some(weak) => match weak.upgrade() {
                Some(rc) => Some(rc),
                None => {
                    self.intern.remove(&offset);
                    None
                }
            },
            None => None,
        }
    }

    /// Registers a reference under its offset. Weak bookkeeping only; the
    /// table never keeps a `Data` alive.
    pub(crate) fn intern_store(&mut self, offset: u64, inner: &Rc<RefCell<DataInner>>) {
        self.intern.insert(offset, Rc::downgrade(inner));
    }
}

impl Read for Pager {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &self.map {
            Some(map) => {
                let len = map.len() as u64;
                if self.pos >= len {
                    return Ok(0);
                }
                let available = (len - self.pos) as usize;
                let n = buf.len().min(available);
                let start = self.pos as usize;
                buf[..n].copy_from_slice(&map[start..start + n]);
                self.pos += n as u64;
                Ok(n)
            }
            None => self.file.read(buf),
        }
    }
}

impl Write for Pager {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.read_only {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "pager is read-only",
            ));
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.read_only {
            return Ok(());
        }
        self.file.flush()
    }
}

impl Seek for Pager {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &self.map {
            Some(map) => {
                let len = map.len() as i64;
                let target = match pos {
                    SeekFrom::Start(n) => n as i64,
                    SeekFrom::End(n) => len + n,
                    SeekFrom::Current(n) => self.pos as i64 + n,
                };
                if target < 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "seek before start of file",
                    ));
                }
                self.pos = target as u64;
                Ok(self.pos)
            }
            None => self.file.seek(pos),
        }
    }
}

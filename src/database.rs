// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Database facade: open, connect, close.
//!
//! One `Database` owns one file through one pager. Opening a missing path
//! creates and initialises it; `connect` hands out the root tree handle;
//! `close` freezes the index for writable opens. There is no freeze on
//! drop, so a database abandoned without `close` loses its uncommitted
//! mutations.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{io_error, ReedResult};
use crate::format::{Header, NodeLayout};
use crate::pager::{Pager, SharedPager};
use crate::tree::Tree;

/// One open database file.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    read_only: bool,
    pager: SharedPager,
    header: Header,
    root: Option<Tree>,
}

impl Database {
    /// Opens a database file for reading and writing, creating and
    /// initialising it when it does not exist yet.
    ///
    /// ## Output
    /// - `ReedResult<Database>`: open handle; call `connect` next
    ///
    /// ## Error Conditions
    /// - `ReedError::IoError` when the file cannot be created or opened
    /// - `ReedError::Corruption` when the header is damaged or carries a
    ///   foreign signature or order
    ///
    /// ## Example Usage
    /// ```rust,no_run
    /// use reedtree::Database;
    ///
    /// let mut db = Database::open("data.reedtree")?;
    /// let root = db.connect()?;
    /// root.insert("key", "value")?;
    /// db.close()?;
    /// # Ok::<(), reedtree::ReedError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> ReedResult<Self> {
        Self::open_with(path.as_ref(), false)
    }

    /// Opens an existing database file read-only; reads are backed by a
    /// memory mapping. Mutating operations fail, `close` does not freeze.
    ///
    /// ## Error Conditions
    /// - `ReedError::IoError` when the file does not exist
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> ReedResult<Self> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, read_only: bool) -> ReedResult<Self> {
        if !path.exists() {
            if read_only {
                return Err(io_error(
                    "open",
                    path.to_string_lossy(),
                    "file does not exist",
                ));
            }
            Self::init_file(path)?;
            log::info!("created database file {}", path.display());
        }

        let pager = if read_only {
            Pager::open_read_only(path)?
        } else {
            Pager::open_rw(path)?
        };
        let pager: SharedPager = Rc::new(RefCell::new(pager));

        let header = {
            let mut p = pager.borrow_mut();
            p.seek_to(0)?;
            Header::load(&mut *p)?
        };

        Ok(Self {
            path: path.to_path_buf(),
            read_only,
            pager,
            header,
            root: None,
        })
    }

    /// Writes the initial file: a header pointing at a freshly appended
    /// empty root node.
    fn init_file(path: &Path) -> ReedResult<()> {
        let mut pager = Pager::create(path)?;
        pager.seek_to(0)?;
        Header::new(0).dump(&mut pager)?;
        let root_position = pager.tell()?;
        NodeLayout::default().dump(&mut pager)?;
        pager.seek_to(0)?;
        Header::new(root_position).dump(&mut pager)?;
        pager.close()
    }

    /// Returns the root tree handle, loaded eagerly.
    ///
    /// All store operations (insert, search, range, vacuum, ...) live on
    /// the returned `Tree`.
    pub fn connect(&mut self) -> ReedResult<Tree> {
        let root = Tree::attach(&self.pager, self.header.root_node, None);
        root.access()?;
        self.root = Some(root.clone());
        Ok(root)
    }

    /// Closes the database. Writable opens freeze the index first, so
    /// this call is what makes mutations durable.
    pub fn close(self) -> ReedResult<()> {
        if !self.read_only {
            if let Some(root) = &self.root {
                root.freeze_node()?;
            }
        }
        Ok(())
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle was opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

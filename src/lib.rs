// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! ReedTree - Embedded single-file key-value store with hierarchical typed values.
//!
//! One file on disk, one B-tree-of-B-trees inside it. A `Database` opens the
//! file and hands out a `Tree` handle; inserts, searches, updates, deletes and
//! range scans run against in-memory node mirrors, and an explicit `freeze`
//! batches the mutations back to disk. Values are typed (string, number,
//! boolean, bytes, empty) and may themselves be nested trees or
//! dynamically-growing arrays, which is how the document-like hierarchy is
//! built.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reedtree::Database;
//!
//! let mut db = Database::open("data.reedtree")?;
//! let root = db.connect()?;
//!
//! root.insert("hello", "world")?;
//! let value = root.search("hello")?.get()?;
//!
//! db.close()?;
//! # Ok::<(), reedtree::ReedError>(())
//! ```
//!
//! ## Architecture
//!
//! - **format**: on-disk binary layout (header, B-node record, tagged values)
//! - **pager**: file handle, seek/read/write, read-only memory mapping, swap
//! - **data**: lazy interned references to tagged values on disk
//! - **tree**: the virtual B-node machinery (search, mutate, freeze, vacuum)
//! - **array**: dynamically-growing arrays backed by power-of-two slot regions
//! - **database**: open/connect/close facade
//!
//! ## Durability
//!
//! There is no write-ahead log and no fsync discipline. `Database::close`
//! freezes the index; a crash before that loses uncommitted mutations. This
//! is a documented limitation, not an accident.

pub mod array;
pub mod data;
pub mod database;
pub mod error;
pub mod format;
pub mod pager;
pub mod tree;

pub use array::Array;
pub use data::{Data, NewValue, Value};
pub use database::Database;
pub use error::{ReedError, ReedResult};
pub use tree::Tree;

#[cfg(test)]
mod database_test;

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Database file header.
//!
//! ## Layout (13 bytes)
//! ```text
//! Offset | Size | Field
//! -------|------|------------------------------
//! 0      | 3    | signature (ASCII "BTR")
//! 3      | 2    | btree_order (u16 big-endian)
//! 5      | 8    | root_node offset (u64 big-endian)
//! ```
//!
//! The signature and the order are validated on load; a mismatch of either
//! rejects the file as corrupt.

use std::io::{Read, Write};

use crate::error::{corruption, ReedResult};
use crate::format::primitive::{read_u16, read_u64, write_u16, write_u64};
use crate::format::types::{ORDER, SIGNATURE};

/// Header size in bytes.
pub const HEADER_SIZE: u64 = 13;

/// Fixed-size header at the start of every database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Static tree fan-out the file was written with.
    pub order: u16,

    /// Offset of the root B-node.
    pub root_node: u64,
}

impl Header {
    /// Creates a header for the compiled-in order.
    pub fn new(root_node: u64) -> Self {
        Self {
            order: ORDER as u16,
            root_node,
        }
    }

    /// Parses and validates a header from the current position.
    ///
    /// ## Error Conditions
    /// - Signature differs from "BTR"
    /// - Stored order differs from the compiled-in order
    /// - Short read
    pub fn load<R: Read>(r: &mut R) -> ReedResult<Self> {
        let mut signature = [0u8; 3];
        r.read_exact(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(corruption(
                "load_header",
                format!("bad signature {:?}, expected \"BTR\"", signature),
            ));
        }

        let order = read_u16(r)?;
        if order as usize != ORDER {
            return Err(corruption(
                "load_header",
                format!("unsupported order {}, expected {}", order, ORDER),
            ));
        }

        let root_node = read_u64(r)?;

        Ok(Self { order, root_node })
    }

    /// Writes the header at the current position.
    pub fn dump<W: Write>(&self, w: &mut W) -> ReedResult<()> {
        w.write_all(SIGNATURE)?;
        write_u16(w, self.order)?;
        write_u64(w, self.root_node)?;
        Ok(())
    }
}

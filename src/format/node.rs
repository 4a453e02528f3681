// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size on-disk B-node record.
//!
//! ## Layout (1520 bytes at order 64)
//! ```text
//! Offset | Size        | Field
//! -------|-------------|------------------------------------
//! 0      | (ORDER-1)*8 | key offsets (u64 big-endian each)
//! 504    | (ORDER-1)*8 | value offsets
//! 1008   | ORDER*8     | child offsets
//! ```
//!
//! Unused slots hold 0. The record size never changes, so a node is safely
//! overwritten in place when it is frozen again. Load strips the trailing
//! zeros; dump pads them back.

use std::io::{Read, Write};

use crate::error::ReedResult;
use crate::format::primitive::{read_u64, write_u64};
use crate::format::types::{MAX_KEYS, ORDER};

/// B-node record size in bytes: `(2*(ORDER-1) + ORDER) * 8`.
pub const NODE_SIZE: u64 = ((2 * (ORDER - 1) + ORDER) * 8) as u64;

/// One B-node record with the zero padding stripped.
///
/// Key pointers lead to tagged values used for comparison, value pointers to
/// tagged values, child pointers to further B-node records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLayout {
    pub keys: Vec<u64>,
    pub values: Vec<u64>,
    pub children: Vec<u64>,
}

impl NodeLayout {
    /// Parses a record from the current position, discarding zero slots.
    pub fn load<R: Read>(r: &mut R) -> ReedResult<Self> {
        let keys = load_slots(r, MAX_KEYS)?;
        let values = load_slots(r, MAX_KEYS)?;
        let children = load_slots(r, ORDER)?;

        Ok(Self {
            keys,
            values,
            children,
        })
    }

    /// Writes the record at the current position, padding unused slots
    /// with zeros.
    pub fn dump<W: Write>(&self, w: &mut W) -> ReedResult<()> {
        dump_slots(w, &self.keys, MAX_KEYS)?;
        dump_slots(w, &self.values, MAX_KEYS)?;
        dump_slots(w, &self.children, ORDER)?;
        Ok(())
    }
}

fn load_slots<R: Read>(r: &mut R, count: usize) -> ReedResult<Vec<u64>> {
    let mut slots = Vec::with_capacity(count);
    for _ in 0..count {
        let p = read_u64(r)?;
        if p != 0 {
            slots.push(p);
        }
    }
    Ok(slots)
}

fn dump_slots<W: Write>(w: &mut W, slots: &[u64], count: usize) -> ReedResult<()> {
    for p in slots {
        write_u64(w, *p)?;
    }
    for _ in slots.len()..count {
        write_u64(w, 0)?;
    }
    Ok(())
}

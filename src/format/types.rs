// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Core constants and the value tag table of the file format.

use crate::error::{corruption, ReedResult};

/// File signature, the first three bytes of every database file.
pub const SIGNATURE: &[u8; 3] = b"BTR";

/// Static B-tree fan-out.
///
/// Bigger order means fewer levels and faster access, but a growing share of
/// node space that is occupied yet never used. The order is baked into the
/// node record size, so a file written with one order cannot be read with
/// another.
pub const ORDER: usize = 64;

/// Maximum number of keys per node (`ORDER - 1`).
pub const MAX_KEYS: usize = ORDER - 1;

/// Minimum number of keys per non-root node (`ceil(ORDER / 2) - 1`).
pub const MIN_KEYS: usize = (ORDER + 1) / 2 - 1;

/// Smallest slot-region power for new arrays (`2^3` = 8 slots).
pub const MIN_ARRAY_POWER: u8 = 3;

/// Tag byte of every stored value, deciding how the payload is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeCode {
    /// 4-byte length, UTF-8 bytes.
    String = 0,

    /// 4-byte big-endian IEEE-754 single-precision float.
    Number = 1,

    /// 8-byte offset of the root B-node of a nested tree.
    Tree = 2,

    /// No payload.
    Empty = 3,

    /// One byte; 1 is true, anything else decodes as false.
    Boolean = 4,

    /// 4-byte length, raw bytes.
    Bytes = 5,

    /// 1-byte power, 4-byte length, 8-byte slot-region offset.
    Array = 6,
}

impl TypeCode {
    /// Parses a tag byte. An unknown tag means the file is corrupt.
    pub fn from_u8(code: u8) -> ReedResult<Self> {
        match code {
            0 => Ok(Self::String),
            1 => Ok(Self::Number),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Empty),
            4 => Ok(Self::Boolean),
            5 => Ok(Self::Bytes),
            6 => Ok(Self::Array),
            other => Err(corruption(
                "decode_tag",
                format!("unknown tag byte {}", other),
            )),
        }
    }

    /// Returns the tag byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Primitive codecs: fixed-width big-endian unsigned integers, raw IEEE-754
//! float32, and 4-byte-length-prefixed byte and string blobs.
//!
//! All functions are generic over `Read`/`Write` so they serve the pager and
//! plain buffers alike. Short reads surface as corruption through the
//! `From<io::Error>` conversion.

use std::io::{Read, Write};

use crate::error::{corruption, ReedResult};

/// Reads one unsigned byte.
pub fn read_u8<R: Read>(r: &mut R) -> ReedResult<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a big-endian u16.
pub fn read_u16<R: Read>(r: &mut R) -> ReedResult<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

/// Reads a big-endian u32.
pub fn read_u32<R: Read>(r: &mut R) -> ReedResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads a big-endian u64.
pub fn read_u64<R: Read>(r: &mut R) -> ReedResult<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Reads a big-endian IEEE-754 single-precision float.
pub fn read_f32<R: Read>(r: &mut R) -> ReedResult<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_be_bytes(buf))
}

/// Reads exactly `n` raw bytes.
pub fn read_bytes<R: Read>(r: &mut R, n: usize) -> ReedResult<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads a 4-byte-length-prefixed byte blob.
pub fn read_blob<R: Read>(r: &mut R) -> ReedResult<Vec<u8>> {
    let length = read_u32(r)? as usize;
    read_bytes(r, length)
}

/// Reads a 4-byte-length-prefixed UTF-8 string.
pub fn read_string<R: Read>(r: &mut R) -> ReedResult<String> {
    let raw = read_blob(r)?;
    String::from_utf8(raw).map_err(|e| corruption("decode_string", e.to_string()))
}

/// Writes one unsigned byte.
pub fn write_u8<W: Write>(w: &mut W, n: u8) -> ReedResult<()> {
    w.write_all(&[n])?;
    Ok(())
}

/// Writes a big-endian u16.
pub fn write_u16<W: Write>(w: &mut W, n: u16) -> ReedResult<()> {
    w.write_all(&n.to_be_bytes())?;
    Ok(())
}

/// Writes a big-endian u32.
pub fn write_u32<W: Write>(w: &mut W, n: u32) -> ReedResult<()> {
    w.write_all(&n.to_be_bytes())?;
    Ok(())
}

/// Writes a big-endian u64.
pub fn write_u64<W: Write>(w: &mut W, n: u64) -> ReedResult<()> {
    w.write_all(&n.to_be_bytes())?;
    Ok(())
}

/// Writes a big-endian IEEE-754 single-precision float.
pub fn write_f32<W: Write>(w: &mut W, n: f32) -> ReedResult<()> {
    w.write_all(&n.to_be_bytes())?;
    Ok(())
}

/// Writes a 4-byte-length-prefixed byte blob.
pub fn write_blob<W: Write>(w: &mut W, b: &[u8]) -> ReedResult<()> {
    write_u32(w, b.len() as u32)?;
    w.write_all(b)?;
    Ok(())
}

/// Writes a 4-byte-length-prefixed UTF-8 string.
pub fn write_string<W: Write>(w: &mut W, s: &str) -> ReedResult<()> {
    write_blob(w, s.as_bytes())
}

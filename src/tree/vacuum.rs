// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Vacuum: full copy compaction.
//!
//! `update` and `delete` leave their old bytes behind; vacuum walks the
//! tree in post order and copies every reachable key and value into a
//! sibling temporary file, rewrites the header, renames the new file over
//! the old one, and swaps the fresh handle into the shared pager. A
//! cross-reference table maps old offsets to new ones so a value shared by
//! several keys is copied once and referenced many times.
//!
//! Slow by nature (it copies the live data set); worth running when updates
//! and deletions have piled up.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::rc::Rc;

use chrono::{Datelike, Timelike};

use crate::array::Array;
use crate::data::value::Value;
use crate::data::Data;
use crate::error::{io_error, unsupported_type, ReedResult};
use crate::format::{
    write_blob, write_f32, write_string, write_u32, write_u64, write_u8, Header, NodeLayout,
    TypeCode,
};
use crate::pager::{Pager, SharedPager};

use super::node::Tree;

impl Tree {
    /// Compacts the database file, returning the number of freed bytes.
    ///
    /// ## Behaviour
    /// - Freezes all in-memory state first, then copies the reachable data
    ///   into `<file>.<YYYY_M_D_H_M_S>.tmp` and renames it over the
    ///   original.
    /// - The pager handle everyone shares is swapped in place; this root
    ///   handle re-seats onto the new file. References obtained before the
    ///   vacuum are stale afterwards and must be looked up again.
    /// - Call this on the handle obtained from `Database::connect`;
    ///   vacuuming a nested subtree would compact only that subtree into
    ///   the file.
    ///
    /// ## Output
    /// - `ReedResult<u64>`: bytes freed, never negative
    ///
    /// ## Error Conditions
    /// - `ReedError::IoError` on any file operation; the original file is
    ///   untouched until the final rename
    pub fn vacuum(&self) -> ReedResult<u64> {
        log::info!("vacuum started");

        self.freeze_node()?;

        let pager = self.pager();
        let path = pager.borrow().path().to_path_buf();
        let before = pager.borrow_mut().seek_end()?;

        let now = chrono::Local::now();
        let stamp = format!(
            "{}_{}_{}_{}_{}_{}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second()
        );
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| io_error("vacuum", path.to_string_lossy(), "path has no file name"))?;
        let tmp_path = path.with_file_name(format!("{}.{}.tmp", file_name, stamp));

        let new_root = {
            let out: SharedPager = Rc::new(RefCell::new(Pager::create(&tmp_path)?));
            {
                let mut o = out.borrow_mut();
                o.seek_to(0)?;
                Header::new(0).dump(&mut *o)?;
            }

            let mut crossref = HashMap::new();
            let new_root = self.vacuum_into(&out, &mut crossref)?;

            {
                let mut o = out.borrow_mut();
                o.seek_to(0)?;
                Header::new(new_root).dump(&mut *o)?;
            }
            new_root
        };

        std::fs::rename(&tmp_path, &path)
            .map_err(|e| io_error("rename", tmp_path.to_string_lossy(), e.to_string()))?;

        let new_file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_error("reopen", path.to_string_lossy(), e.to_string()))?;
        pager.borrow_mut().swap(new_file);

        self.reseat(new_root)?;

        let after = pager.borrow_mut().seek_end()?;
        assert!(after <= before, "vacuum must not grow the file");
        let freed = before - after;

        log::info!("vacuum finished, freed {} bytes", freed);
        Ok(freed)
    }

    /// Copies this node and everything below it into `out`, returning the
    /// new node position. Post order: keys and values first, children next,
    /// the node record last.
    fn vacuum_into(
        &self,
        out: &SharedPager,
        crossref: &mut HashMap<u64, u64>,
    ) -> ReedResult<u64> {
        self.ensure_accessed()?;

        // Keys are copied unconditionally; they are never shared.
        let keys = self.keys_snapshot();
        let mut key_offsets = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = key.get_cached()?;
            key_offsets.push(copy_primitive(out, &value)?);
        }

        let values = self.values_snapshot();
        let mut value_offsets = Vec::with_capacity(values.len());
        for value in &values {
            value_offsets.push(copy_data(value, out, crossref)?);
        }

        let children = self.children_snapshot();
        let mut child_offsets = Vec::with_capacity(children.len());
        for child in &children {
            child_offsets.push(child.vacuum_into(out, crossref)?);
        }

        let mut o = out.borrow_mut();
        let position = o.seek_end()?;
        NodeLayout {
            keys: key_offsets,
            values: value_offsets,
            children: child_offsets,
        }
        .dump(&mut *o)?;
        Ok(position)
    }
}

/// Copies one referenced value, consulting the cross-reference table so
/// shared values land in the new file exactly once.
fn copy_data(
    data: &Data,
    out: &SharedPager,
    crossref: &mut HashMap<u64, u64>,
) -> ReedResult<u64> {
    let old_offset = data.offset();
    if let Some(new_offset) = crossref.get(&old_offset) {
        return Ok(*new_offset);
    }

    let new_offset = match data.get()? {
        Value::Tree(subtree) => {
            let new_root = subtree.vacuum_into(out, crossref)?;
            let mut o = out.borrow_mut();
            let position = o.seek_end()?;
            write_u8(&mut *o, TypeCode::Tree.as_u8())?;
            write_u64(&mut *o, new_root)?;
            position
        }
        Value::Array(array) => copy_array(&array, out, crossref)?,
        primitive => copy_primitive(out, &primitive)?,
    };

    crossref.insert(old_offset, new_offset);
    Ok(new_offset)
}

/// Copies an array: elements first, then a fresh slot region, then the
/// header. The region keeps its power.
fn copy_array(
    array: &Array,
    out: &SharedPager,
    crossref: &mut HashMap<u64, u64>,
) -> ReedResult<u64> {
    let length = array.len();
    let power = array.power();

    let mut element_offsets = Vec::with_capacity(length);
    for index in 0..length {
        let element = array.get(index)?;
        element_offsets.push(copy_data(&element, out, crossref)?);
    }

    let mut o = out.borrow_mut();
    let region = o.seek_end()?;
    for offset in &element_offsets {
        write_u64(&mut *o, *offset)?;
    }
    for _ in length..(1usize << power) {
        write_u64(&mut *o, 0)?;
    }

    let position = o.tell()?;
    write_u8(&mut *o, TypeCode::Array.as_u8())?;
    write_u8(&mut *o, power)?;
    write_u32(&mut *o, length as u32)?;
    write_u64(&mut *o, region)?;
    Ok(position)
}

fn copy_primitive(out: &SharedPager, value: &Value) -> ReedResult<u64> {
    let mut o = out.borrow_mut();
    let position = o.seek_end()?;
    match value {
        Value::String(s) => {
            write_u8(&mut *o, TypeCode::String.as_u8())?;
            write_string(&mut *o, s)?;
        }
        Value::Number(n) => {
            write_u8(&mut *o, TypeCode::Number.as_u8())?;
            write_f32(&mut *o, *n)?;
        }
        Value::Boolean(b) => {
            write_u8(&mut *o, TypeCode::Boolean.as_u8())?;
            write_u8(&mut *o, if *b { 1 } else { 0 })?;
        }
        Value::Bytes(b) => {
            write_u8(&mut *o, TypeCode::Bytes.as_u8())?;
            write_blob(&mut *o, b)?;
        }
        Value::Empty => {
            write_u8(&mut *o, TypeCode::Empty.as_u8())?;
        }
        Value::Tree(_) | Value::Array(_) => {
            return Err(unsupported_type("container handed to the primitive copier"));
        }
    }
    Ok(position)
}

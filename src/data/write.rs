// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tagged value encoding.
//!
//! Values are appended at the end of the file; the returned `Data` points
//! at the tag byte. Container literals are built here too: a `List` writes
//! its elements, a slot region sized to the next power of two, and the
//! array header; a `Map` writes an empty B-node, the tree tag, and then
//! inserts the entries into the in-memory subtree, which the next freeze
//! carries to disk.

use crate::array::Array;
use crate::error::ReedResult;
use crate::format::{
    write_blob, write_f32, write_string, write_u32, write_u64, write_u8, NodeLayout, TypeCode,
    MIN_ARRAY_POWER,
};
use crate::pager::SharedPager;
use crate::tree::Tree;

use super::reference::Data;
use super::value::{NewValue, Value};

/// Encodes a value at the end of the file and returns its reference.
///
/// `Existing` references are passed through untouched: the already-written
/// blob gets a second holder instead of a copy.
pub(crate) fn write_value(pager: &SharedPager, value: &NewValue) -> ReedResult<Data> {
    match value {
        NewValue::Existing(data) => Ok(data.clone()),
        NewValue::String(_)
        | NewValue::Number(_)
        | NewValue::Boolean(_)
        | NewValue::Bytes(_)
        | NewValue::Empty => {
            let offset = write_primitive(pager, value)?;
            Ok(Data::fresh(pager, offset, None))
        }
        NewValue::List(items) => write_list(pager, items),
        NewValue::Map(entries) => write_map(pager, entries),
    }
}

fn write_primitive(pager: &SharedPager, value: &NewValue) -> ReedResult<u64> {
    let mut p = pager.borrow_mut();
    let offset = p.seek_end()?;
    match value {
        NewValue::String(s) => {
            write_u8(&mut *p, TypeCode::String.as_u8())?;
            write_string(&mut *p, s)?;
        }
        NewValue::Number(n) => {
            write_u8(&mut *p, TypeCode::Number.as_u8())?;
            write_f32(&mut *p, *n)?;
        }
        NewValue::Boolean(b) => {
            write_u8(&mut *p, TypeCode::Boolean.as_u8())?;
            write_u8(&mut *p, if *b { 1 } else { 0 })?;
        }
        NewValue::Bytes(b) => {
            write_u8(&mut *p, TypeCode::Bytes.as_u8())?;
            write_blob(&mut *p, b)?;
        }
        NewValue::Empty => {
            write_u8(&mut *p, TypeCode::Empty.as_u8())?;
        }
        NewValue::List(_) | NewValue::Map(_) | NewValue::Existing(_) => {
            unreachable!("containers are encoded by their own writers")
        }
    }
    Ok(offset)
}

/// Smallest power of two region that fits `length` slots, floored at
/// `2^MIN_ARRAY_POWER`.
pub(crate) fn region_power(length: usize) -> u8 {
    let mut power = MIN_ARRAY_POWER;
    while (1usize << power) < length {
        power += 1;
    }
    power
}

fn write_list(pager: &SharedPager, items: &[NewValue]) -> ReedResult<Data> {
    // Elements first; the region needs their offsets.
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        elements.push(write_value(pager, item)?);
    }

    let power = region_power(items.len());
    let length = items.len() as u32;

    let (header_offset, start) = {
        let mut p = pager.borrow_mut();
        let start = p.seek_end()?;
        for element in &elements {
            write_u64(&mut *p, element.offset())?;
        }
        for _ in items.len()..(1usize << power) {
            write_u64(&mut *p, 0)?;
        }
        let header_offset = p.tell()?;
        write_u8(&mut *p, TypeCode::Array.as_u8())?;
        write_u8(&mut *p, power)?;
        write_u32(&mut *p, length)?;
        write_u64(&mut *p, start)?;
        (header_offset, start)
    };

    // The element references stay attached as overrides so in-memory
    // subtrees among them are reached by the next freeze.
    let array = Array::literal(pager, header_offset, power, length, start, elements);
    let data = Data::fresh(pager, header_offset, Some(Value::Array(array)));
    Ok(data)
}

fn write_map(pager: &SharedPager, entries: &[(NewValue, NewValue)]) -> ReedResult<Data> {
    let (root_offset, header_offset) = {
        let mut p = pager.borrow_mut();
        let root_offset = p.seek_end()?;
        NodeLayout::default().dump(&mut *p)?;
        let header_offset = p.tell()?;
        write_u8(&mut *p, TypeCode::Tree.as_u8())?;
        write_u64(&mut *p, root_offset)?;
        (root_offset, header_offset)
    };

    let tree = Tree::fresh_root_at(pager, root_offset);
    for (key, value) in entries {
        tree.insert_new(key, value)?;
    }

    let data = Data::fresh(pager, header_offset, Some(Value::Tree(tree)));
    Ok(data)
}

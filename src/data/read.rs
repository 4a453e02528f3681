// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tagged value decoding.
//!
//! One dispatch point for every stored value: read the tag byte, parse the
//! payload the tag announces. Decoding a tree constructs a live node handle
//! bound to the embedded root offset; decoding an array constructs a live
//! array handle bound to the header position, so later freezes can rewrite
//! length, power and region start in place.

use crate::array::Array;
use crate::error::ReedResult;
use crate::format::{read_blob, read_f32, read_string, read_u32, read_u64, read_u8, TypeCode};
use crate::pager::SharedPager;
use crate::tree::Tree;

use super::value::Value;

/// Decodes the tagged value at `offset`.
pub(crate) fn read_value(pager: &SharedPager, offset: u64) -> ReedResult<Value> {
    enum Raw {
        Done(Value),
        Tree(u64),
        Array { power: u8, length: u32, start: u64 },
    }

    let raw = {
        let mut p = pager.borrow_mut();
        p.seek_to(offset)?;
        let code = TypeCode::from_u8(read_u8(&mut *p)?)?;
        match code {
            TypeCode::String => Raw::Done(Value::String(read_string(&mut *p)?)),
            TypeCode::Number => Raw::Done(Value::Number(read_f32(&mut *p)?)),
            TypeCode::Empty => Raw::Done(Value::Empty),
            TypeCode::Boolean => Raw::Done(Value::Boolean(read_u8(&mut *p)? == 1)),
            TypeCode::Bytes => Raw::Done(Value::Bytes(read_blob(&mut *p)?)),
            TypeCode::Tree => Raw::Tree(read_u64(&mut *p)?),
            TypeCode::Array => Raw::Array {
                power: read_u8(&mut *p)?,
                length: read_u32(&mut *p)?,
                start: read_u64(&mut *p)?,
            },
        }
    };

    // Containers are constructed after the pager borrow is released; both
    // need the pager themselves.
    match raw {
        Raw::Done(value) => Ok(value),
        Raw::Tree(root) => {
            let tree = Tree::attach(pager, root, None);
            tree.access()?;
            Ok(Value::Tree(tree))
        }
        Raw::Array {
            power,
            length,
            start,
        } => Ok(Value::Array(Array::attach(
            pager, offset, power, length, start,
        ))),
    }
}

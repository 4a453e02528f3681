// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The virtual array: a variable-length dense vector over a power-of-two
//! slot region.
//!
//! On disk an array is a header (power, length, region offset) and a region
//! of `2^power` element pointers, of which the first `length` are
//! meaningful. In memory, mutations land in an override vector; `freeze`
//! writes them back, allocating a fresh doubled region first when appends
//! outgrew the current one. The old region is not reclaimed in place; that
//! is vacuum's job.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::data::value::{NewValue, Value};
use crate::data::write::write_value;
use crate::data::Data;
use crate::error::{index_out_of_range, ReedResult};
use crate::format::{read_u64, write_u32, write_u64, write_u8, TypeCode};
use crate::pager::SharedPager;

struct ArrayInner {
    pager: SharedPager,
    /// Position of the tag byte; the header is rewritten here on freeze.
    header_offset: u64,
    power: u8,
    length: u32,
    /// Offset of the slot region currently on disk.
    start: u64,
    /// In-memory element replacements, index-aligned with the array.
    overrides: Vec<Option<Data>>,
    /// Set when appends passed `2^power`; freeze then allocates a fresh
    /// region instead of patching slots in place.
    grew: bool,
    /// Set by any mutation; cleared by freeze.
    dirty: bool,
}

/// Handle to one stored array. Clones share state.
#[derive(Clone)]
pub struct Array {
    inner: Rc<RefCell<ArrayInner>>,
}

impl Array {
    /// Binds a handle to an array header already on disk.
    pub(crate) fn attach(
        pager: &SharedPager,
        header_offset: u64,
        power: u8,
        length: u32,
        start: u64,
    ) -> Array {
        Array {
            inner: Rc::new(RefCell::new(ArrayInner {
                pager: pager.clone(),
                header_offset,
                power,
                length,
                start,
                overrides: vec![None; length as usize],
                grew: false,
                dirty: false,
            })),
        }
    }

    /// Binds a handle to a freshly written literal, keeping the element
    /// references attached so nested in-memory structures among them are
    /// reached by the next freeze.
    pub(crate) fn literal(
        pager: &SharedPager,
        header_offset: u64,
        power: u8,
        length: u32,
        start: u64,
        elements: Vec<Data>,
    ) -> Array {
        Array {
            inner: Rc::new(RefCell::new(ArrayInner {
                pager: pager.clone(),
                header_offset,
                power,
                length,
                start,
                overrides: elements.into_iter().map(Some).collect(),
                grew: false,
                dirty: false,
            })),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.borrow().length as usize
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current region power; the region holds `2^power` slots.
    pub fn power(&self) -> u8 {
        self.inner.borrow().power
    }

    /// Returns the element reference at `index`.
    ///
    /// ## Error Conditions
    /// - `ReedError::IndexOutOfRange` when `index >= len()`
    pub fn get(&self, index: usize) -> ReedResult<Data> {
        let (pager, start) = {
            let inner = self.inner.borrow();
            if index >= inner.length as usize {
                return Err(index_out_of_range(index, inner.length as usize));
            }
            if let Some(data) = &inner.overrides[index] {
                return Ok(data.clone());
            }
            (inner.pager.clone(), inner.start)
        };

        let pointer = {
            let mut p = pager.borrow_mut();
            p.seek_to(start + (index as u64) * 8)?;
            read_u64(&mut *p)?
        };
        Ok(Data::load(&pager, pointer))
    }

    /// Decodes the element at `index`. Shorthand for `get(index)?.get()`.
    pub fn get_value(&self, index: usize) -> ReedResult<Value> {
        self.get(index)?.get()
    }

    /// Replaces the element at `index`, returning the new reference.
    ///
    /// The value is encoded at the end of the file (unless it is an
    /// existing reference); the slot itself is patched on freeze.
    ///
    /// ## Error Conditions
    /// - `ReedError::IndexOutOfRange` when `index >= len()`; nothing is
    ///   written in that case
    pub fn set<V: Into<NewValue>>(&self, index: usize, value: V) -> ReedResult<Data> {
        {
            let inner = self.inner.borrow();
            if index >= inner.length as usize {
                return Err(index_out_of_range(index, inner.length as usize));
            }
        }

        let pager = self.inner.borrow().pager.clone();
        let data = write_value(&pager, &value.into())?;
        {
            let mut inner = self.inner.borrow_mut();
            inner.overrides[index] = Some(data.clone());
            inner.dirty = true;
        }
        Ok(data)
    }

    /// Appends an element, returning its reference.
    ///
    /// Growing past `2^power` bumps the power; the doubled region is
    /// allocated when the array next freezes, not here.
    pub fn append<V: Into<NewValue>>(&self, value: V) -> ReedResult<Data> {
        let pager = self.inner.borrow().pager.clone();
        let data = write_value(&pager, &value.into())?;
        {
            let mut inner = self.inner.borrow_mut();
            inner.overrides.push(Some(data.clone()));
            inner.length += 1;
            if inner.length as usize > (1usize << inner.power) {
                inner.power += 1;
                inner.grew = true;
            }
            inner.dirty = true;
        }
        Ok(data)
    }

    /// Writes pending mutations to disk.
    ///
    /// ## Behaviour
    /// - Grown arrays get a fresh `2^power` region at the end of the file,
    ///   filled from overrides where present and from the old region
    ///   otherwise.
    /// - Un-grown arrays patch only the overridden slots in place.
    /// - Overrides whose cache holds an in-memory tree or array freeze
    ///   recursively.
    /// - The header (power, length, region offset) is rewritten at its
    ///   original position, after which the override vector resets.
    pub fn freeze(&self) -> ReedResult<()> {
        let (pager, dirty, grew, power, length, old_start, overrides) = {
            let inner = self.inner.borrow();
            (
                inner.pager.clone(),
                inner.dirty,
                inner.grew,
                inner.power,
                inner.length,
                inner.start,
                inner.overrides.clone(),
            )
        };

        let new_start = if grew {
            // Collect the full slot image before touching the file; slots
            // without an override still live in the old region.
            let mut slots = Vec::with_capacity(length as usize);
            for (index, element) in overrides.iter().enumerate() {
                match element {
                    Some(data) => slots.push(data.offset()),
                    None => {
                        let mut p = pager.borrow_mut();
                        p.seek_to(old_start + (index as u64) * 8)?;
                        slots.push(read_u64(&mut *p)?);
                    }
                }
            }

            let mut p = pager.borrow_mut();
            let start = p.seek_end()?;
            for slot in &slots {
                write_u64(&mut *p, *slot)?;
            }
            for _ in slots.len()..(1usize << power) {
                write_u64(&mut *p, 0)?;
            }
            start
        } else {
            if dirty {
                let mut p = pager.borrow_mut();
                for (index, element) in overrides.iter().enumerate() {
                    if let Some(data) = element {
                        p.seek_to(old_start + (index as u64) * 8)?;
                        write_u64(&mut *p, data.offset())?;
                    }
                }
            }
            old_start
        };

        // Nested structures held by overrides carry pending mutations of
        // their own.
        for element in overrides.iter().flatten() {
            match element.cached_value() {
                Some(Value::Tree(subtree)) => {
                    subtree.freeze_node()?;
                }
                Some(Value::Array(array)) => {
                    array.freeze()?;
                }
                _ => {}
            }
        }

        if dirty {
            let header_offset = self.inner.borrow().header_offset;
            let mut p = pager.borrow_mut();
            p.seek_to(header_offset)?;
            write_u8(&mut *p, TypeCode::Array.as_u8())?;
            write_u8(&mut *p, power)?;
            write_u32(&mut *p, length)?;
            write_u64(&mut *p, new_start)?;
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.start = new_start;
            inner.grew = false;
            inner.dirty = false;
            inner.overrides = vec![None; inner.length as usize];
        }

        Ok(())
    }

    /// Decodes every element into a vector. Convenience for small arrays.
    pub fn to_values(&self) -> ReedResult<Vec<Value>> {
        let length = self.len();
        let mut values = Vec::with_capacity(length);
        for index in 0..length {
            values.push(self.get(index)?.get()?);
        }
        Ok(values)
    }

    /// Handle identity; two handles to the same array share state.
    pub(crate) fn same_array(a: &Array, b: &Array) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Re-reads the array header, used only by tests that want to observe
    /// the on-disk state.
    #[cfg(test)]
    pub(crate) fn reload(&self) -> ReedResult<Value> {
        let (pager, header_offset) = {
            let inner = self.inner.borrow();
            (inner.pager.clone(), inner.header_offset)
        };
        crate::data::read::read_value(&pager, header_offset)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => write!(
                f,
                "Array(length={}, power={}, start={})",
                inner.length, inner.power, inner.start
            ),
            Err(_) => write!(f, "Array(<borrowed>)"),
        }
    }
}

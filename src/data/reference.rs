// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Lazy interned references to stored values.
//!
//! A `Data` is an offset into one file plus an optional cache of the decoded
//! payload. Construction always goes through the pager's intern table, so
//! there is at most one live `Data` per offset per file. That identity is
//! load-bearing twice over: tree and array mutations made through one
//! reference must be observed by every other holder, and range iteration
//! stops on reference identity rather than key comparison.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::ReedResult;
use crate::pager::SharedPager;

use super::read::read_value;
use super::value::Value;

/// Shared state behind a `Data` handle.
pub(crate) struct DataInner {
    offset: u64,
    pager: SharedPager,
    cached: Option<Value>,
}

/// Lazy reference to a tagged value at some offset of the database file.
#[derive(Clone)]
pub struct Data {
    inner: Rc<RefCell<DataInner>>,
}

impl Data {
    /// Returns the interned reference for an offset, creating it if no live
    /// one exists.
    pub(crate) fn load(pager: &SharedPager, offset: u64) -> Data {
        Self::intern(pager, offset, None)
    }

    /// Returns the interned reference for an offset, seeding the decode
    /// cache when the reference is new. Used for freshly written values
    /// whose decoded form is already in hand.
    pub(crate) fn fresh(pager: &SharedPager, offset: u64, cached: Option<Value>) -> Data {
        Self::intern(pager, offset, cached)
    }

    fn intern(pager: &SharedPager, offset: u64, cached: Option<Value>) -> Data {
        if let Some(existing) = pager.borrow_mut().intern_lookup(offset) {
            let data = Data { inner: existing };
            if let Some(value) = cached {
                let mut inner = data.inner.borrow_mut();
                if inner.cached.is_none() {
                    inner.cached = Some(value);
                }
            }
            return data;
        }

        let inner = Rc::new(RefCell::new(DataInner {
            offset,
            pager: pager.clone(),
            cached,
        }));
        pager.borrow_mut().intern_store(offset, &inner);
        Data { inner }
    }

    /// Byte offset of the tag byte this reference points at.
    pub fn offset(&self) -> u64 {
        self.inner.borrow().offset
    }

    /// Decodes the referenced value.
    ///
    /// ## Behaviour
    /// - Primitives are read from disk on every call; the cache is neither
    ///   consulted nor populated, keeping memory for the index rather than
    ///   the payloads.
    /// - Trees and arrays always come from the cache once decoded. Their
    ///   in-memory state is the only current one between freezes, so
    ///   re-reading them from disk would hand back stale structure.
    ///
    /// ## Error Conditions
    /// - `ReedError::Corruption` on an unknown tag byte or short read
    /// - `ReedError::IoError` on seek/read failure
    pub fn get(&self) -> ReedResult<Value> {
        self.get_with(false)
    }

    /// Decodes the referenced value, keeping the result cached. Keys are
    /// read through this, since they take part in every comparison.
    pub fn get_cached(&self) -> ReedResult<Value> {
        self.get_with(true)
    }

    fn get_with(&self, use_cache: bool) -> ReedResult<Value> {
        {
            let inner = self.inner.borrow();
            if let Some(value) = &inner.cached {
                if use_cache || matches!(value, Value::Tree(_) | Value::Array(_)) {
                    return Ok(value.clone());
                }
            }
        }

        let (pager, offset) = {
            let inner = self.inner.borrow();
            (inner.pager.clone(), inner.offset)
        };
        let value = read_value(&pager, offset)?;

        let sticky = matches!(value, Value::Tree(_) | Value::Array(_));
        if sticky || use_cache {
            self.inner.borrow_mut().cached = Some(value.clone());
        }

        Ok(value)
    }

    /// Seeds the decode cache without touching the disk.
    pub(crate) fn prime(&self, value: Value) {
        let mut inner = self.inner.borrow_mut();
        if inner.cached.is_none() {
            inner.cached = Some(value);
        }
    }

    /// Currently cached value, if any.
    pub(crate) fn cached_value(&self) -> Option<Value> {
        self.inner.borrow().cached.clone()
    }

    /// Reference identity, the relation interning guarantees unique per
    /// (offset, file).
    pub(crate) fn same_as(&self, other: &Data) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Compares the referenced value with a key. Used by every search and
    /// insert, which is why the decoded form is cached here.
    pub(crate) fn compare_value(&self, key: &Value) -> ReedResult<Ordering> {
        self.get_cached()?.compare(key)
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => write!(f, "Data(offset={})", inner.offset),
            Err(_) => write!(f, "Data(<borrowed>)"),
        }
    }
}

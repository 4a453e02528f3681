// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The virtual B-node: an in-memory mirror of one on-disk node record and
//! the mutation unit of the whole store.
//!
//! ## State machine
//!
//! A node is *unaccessed* (only its file position is known), *accessed*
//! (keys, values and children populated), or *modified* (mutated since
//! load). `access` promotes unaccessed nodes, every structural mutation
//! promotes to modified, and `freeze` writes modified nodes back and clears
//! the flag. Unaccessed nodes are never written; accessed-but-unmodified
//! nodes keep their existing record untouched.
//!
//! ## Ownership
//!
//! A `Tree` is a cheaply clonable handle; children own their subtrees,
//! parents are reached through non-owning back references, so dropping the
//! root releases the whole mirror.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::data::value::{NewValue, Value};
use crate::data::write::write_value;
use crate::data::Data;
use crate::error::{corruption, duplicate_key, key_not_found, unsupported_type, ReedResult};
use crate::format::{NodeLayout, MAX_KEYS, MIN_KEYS};
use crate::pager::SharedPager;

pub(crate) struct Node {
    pager: SharedPager,
    /// On-disk position; None for nodes born from a split that have not
    /// been frozen yet.
    offset: Option<u64>,
    parent: Option<Weak<RefCell<Node>>>,
    keys: Vec<Data>,
    values: Vec<Data>,
    children: Vec<Tree>,
    accessed: bool,
    modified: bool,
}

/// Handle to one tree (equivalently, to its root node). Clones share state.
///
/// The handle returned by `Database::connect` is the root of the file;
/// handles decoded from tree-typed values are roots of nested subtrees and
/// behave exactly the same.
#[derive(Clone)]
pub struct Tree {
    inner: Rc<RefCell<Node>>,
}

impl Tree {
    // == CONSTRUCTION ==

    /// Binds a handle to an on-disk node without loading it.
    pub(crate) fn attach(pager: &SharedPager, offset: u64, parent: Option<&Tree>) -> Tree {
        Tree {
            inner: Rc::new(RefCell::new(Node {
                pager: pager.clone(),
                offset: Some(offset),
                parent: parent.map(|t| Rc::downgrade(&t.inner)),
                keys: Vec::new(),
                values: Vec::new(),
                children: Vec::new(),
                accessed: false,
                modified: false,
            })),
        }
    }

    /// A node with no on-disk position yet; split siblings start here.
    /// Such nodes are accessed and modified from birth, since their whole
    /// content exists only in memory.
    pub(crate) fn fresh(pager: &SharedPager) -> Tree {
        Tree {
            inner: Rc::new(RefCell::new(Node {
                pager: pager.clone(),
                offset: None,
                parent: None,
                keys: Vec::new(),
                values: Vec::new(),
                children: Vec::new(),
                accessed: true,
                modified: true,
            })),
        }
    }

    /// A root for a subtree whose empty node record was just written at
    /// `offset`. Accessed (it is empty, nothing to load) but not modified.
    pub(crate) fn fresh_root_at(pager: &SharedPager, offset: u64) -> Tree {
        Tree {
            inner: Rc::new(RefCell::new(Node {
                pager: pager.clone(),
                offset: Some(offset),
                parent: None,
                keys: Vec::new(),
                values: Vec::new(),
                children: Vec::new(),
                accessed: true,
                modified: false,
            })),
        }
    }

    // == PUBLIC OPERATIONS ==

    /// Inserts a key-value pair, returning the reference of the stored
    /// value.
    ///
    /// ## Input
    /// - `key`: a primitive (string, number, boolean, bytes, empty)
    /// - `value`: any supported value, including `Map`/`List` literals for
    ///   nested structures and `Existing` references for moves
    ///
    /// ## Output
    /// - `ReedResult<Data>`: reference of the inserted value
    ///
    /// ## Error Conditions
    /// - `ReedError::DuplicateKey` when the key is already present; the
    ///   tree is unchanged
    /// - `ReedError::UnsupportedType` when the key is not a primitive
    ///
    /// ## Example Usage
    /// ```rust,no_run
    /// # let mut db = reedtree::Database::open("x.reedtree")?;
    /// # let root = db.connect()?;
    /// root.insert("name", "Vivian")?;
    /// root.insert("visits", 3)?;
    /// # Ok::<(), reedtree::ReedError>(())
    /// ```
    pub fn insert<K, V>(&self, key: K, value: V) -> ReedResult<Data>
    where
        K: Into<NewValue>,
        V: Into<NewValue>,
    {
        let key = key.into();
        let value = value.into();
        self.insert_new(&key, &value)
    }

    pub(crate) fn insert_new(&self, key: &NewValue, value: &NewValue) -> ReedResult<Data> {
        let key_value = key.to_value().ok_or_else(|| {
            unsupported_type(format!("key {} is not a primitive", key.describe()))
        })?;

        let pager = self.pager();
        let key_data = write_value(&pager, key)?;
        key_data.prime(key_value.clone());
        let value_data = write_value(&pager, value)?;

        self.insert_data(&key_value, key_data, value_data.clone(), &key.describe())?;
        Ok(value_data)
    }

    /// Inserts an empty subtree under `key`, returning its reference.
    ///
    /// The subtree behaves like a database of its own: search it, insert
    /// into it, nest further trees below it.
    ///
    /// ## Error Conditions
    /// - `ReedError::DuplicateKey`, `ReedError::UnsupportedType` as for
    ///   `insert`
    pub fn create<K: Into<NewValue>>(&self, key: K) -> ReedResult<Data> {
        let key = key.into();
        self.insert_new(&key, &NewValue::Map(Vec::new()))
    }

    /// Looks up a key, returning the reference of its value.
    ///
    /// ## Error Conditions
    /// - `ReedError::KeyNotFound` when the key is absent
    /// - `ReedError::UnsupportedType` when the key is not a primitive
    pub fn search<K: Into<NewValue>>(&self, key: K) -> ReedResult<Data> {
        let key = key.into();
        self.search_new(&key)
    }

    pub(crate) fn search_new(&self, key: &NewValue) -> ReedResult<Data> {
        let key_value = key.to_value().ok_or_else(|| {
            unsupported_type(format!("key {} is not a primitive", key.describe()))
        })?;
        let (node, index) = self.lookup(&key_value, &key.describe())?;
        Ok(node.value_at(index))
    }

    /// Searches a path of keys through nested trees.
    ///
    /// Every key but the last must resolve to a tree-typed value; the
    /// reference found under the last key is returned undecoded, since its
    /// type is the caller's business.
    ///
    /// ## Error Conditions
    /// - `ReedError::KeyNotFound` when any key along the path is absent
    /// - `ReedError::UnsupportedType` when an intermediate value is not a
    ///   tree, or the path is empty
    pub fn follow(&self, path: Vec<NewValue>) -> ReedResult<Data> {
        let Some((first, rest)) = path.split_first() else {
            return Err(unsupported_type("follow requires at least one key"));
        };

        let mut data = self.search_new(first)?;
        for key in rest {
            match data.get()? {
                Value::Tree(subtree) => {
                    data = subtree.search_new(key)?;
                }
                _ => {
                    return Err(unsupported_type(format!(
                        "value under {} is not a tree",
                        key.describe()
                    )))
                }
            }
        }
        Ok(data)
    }

    /// Replaces the value under `key`, returning the reference of the
    /// previous value.
    ///
    /// The old bytes stay in the file until the next vacuum.
    ///
    /// ## Error Conditions
    /// - `ReedError::KeyNotFound` when the key is absent
    pub fn update<K, V>(&self, key: K, value: V) -> ReedResult<Data>
    where
        K: Into<NewValue>,
        V: Into<NewValue>,
    {
        let key = key.into();
        let value = value.into();
        let key_value = key.to_value().ok_or_else(|| {
            unsupported_type(format!("key {} is not a primitive", key.describe()))
        })?;

        let (node, index) = self.lookup(&key_value, &key.describe())?;
        let old_value = node.value_at(index);

        let new_value = write_value(&self.pager(), &value)?;
        {
            let mut n = node.inner.borrow_mut();
            n.values[index] = new_value;
            n.modified = true;
        }
        Ok(old_value)
    }

    /// Removes the pair under `key`, returning the reference of the
    /// deleted value.
    ///
    /// Internal deletions pull up the in-order predecessor; nodes falling
    /// under half occupancy borrow from or merge with a sibling.
    ///
    /// ## Error Conditions
    /// - `ReedError::KeyNotFound` when the key is absent
    pub fn delete<K: Into<NewValue>>(&self, key: K) -> ReedResult<Data> {
        let key = key.into();
        let key_value = key.to_value().ok_or_else(|| {
            unsupported_type(format!("key {} is not a primitive", key.describe()))
        })?;

        let (node, index) = self.lookup(&key_value, &key.describe())?;
        let deleted = node.value_at(index);

        if node.is_leaf() {
            {
                let mut n = node.inner.borrow_mut();
                n.keys.remove(index);
                n.values.remove(index);
                n.modified = true;
            }
            Self::check_after_delete(&node)?;
        } else {
            let predecessor = node.find_inorder_predecessor(index)?;
            let (moved_key, moved_value) = {
                let mut p = predecessor.inner.borrow_mut();
                p.modified = true;
                let key = p.keys.pop().ok_or_else(|| {
                    corruption("delete", "empty predecessor leaf")
                })?;
                let value = p.values.pop().ok_or_else(|| {
                    corruption("delete", "empty predecessor leaf")
                })?;
                (key, value)
            };
            {
                let mut n = node.inner.borrow_mut();
                n.keys[index] = moved_key;
                n.values[index] = moved_value;
                n.modified = true;
            }
            Self::check_after_delete(&predecessor)?;
        }

        Ok(deleted)
    }

    /// Whether `key` is present.
    pub fn contains<K: Into<NewValue>>(&self, key: K) -> ReedResult<bool> {
        let key = key.into();
        let Some(key_value) = key.to_value() else {
            return Ok(false);
        };
        let (node, index) = self.peek_value(&key_value)?;
        match index {
            Some(i) => Ok(node.key_at(i).compare_value(&key_value)? == Ordering::Equal),
            None => Ok(false),
        }
    }

    /// Writes every pending mutation of this tree (and of nested trees and
    /// arrays reachable through cached values) back to disk.
    ///
    /// Post-order: children first, so parent records carry final child
    /// positions. Nodes that were never accessed or not modified cost
    /// nothing. Calling freeze twice in a row writes nothing the second
    /// time.
    pub fn freeze(&self) -> ReedResult<()> {
        log::debug!("freezing index to disk");
        self.freeze_node()?;
        Ok(())
    }

    // == ACCESS AND SEARCH ==

    /// Loads the node record from disk, materialising keys, values and
    /// child handles. Children stay unaccessed until something walks into
    /// them.
    pub(crate) fn access(&self) -> ReedResult<()> {
        let (pager, offset) = {
            let n = self.inner.borrow();
            (n.pager.clone(), n.offset)
        };
        let offset =
            offset.ok_or_else(|| corruption("access", "node has no on-disk position"))?;

        let layout = {
            let mut p = pager.borrow_mut();
            p.seek_to(offset)?;
            NodeLayout::load(&mut *p)?
        };

        let keys: Vec<Data> = layout.keys.iter().map(|p| Data::load(&pager, *p)).collect();
        let values: Vec<Data> = layout
            .values
            .iter()
            .map(|p| Data::load(&pager, *p))
            .collect();
        let children: Vec<Tree> = layout
            .children
            .iter()
            .map(|p| Tree::attach(&pager, *p, Some(self)))
            .collect();

        let mut n = self.inner.borrow_mut();
        n.keys = keys;
        n.values = values;
        n.children = children;
        n.accessed = true;
        Ok(())
    }

    pub(crate) fn ensure_accessed(&self) -> ReedResult<()> {
        if !self.inner.borrow().accessed {
            self.access()?;
        }
        Ok(())
    }

    /// First position whose key is not less than `key`.
    fn bisect(&self, key: &Value) -> ReedResult<usize> {
        let mut lo = 0;
        let mut hi = self.len_keys();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.key_at(mid).compare_value(key)? == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Exact or closest-right match.
    ///
    /// Returns the node and position of the smallest key not less than
    /// `key`, or (leaf, None) when every key in the tree is smaller.
    /// Children are loaded lazily along the descent.
    pub(crate) fn peek_value(&self, key: &Value) -> ReedResult<(Tree, Option<usize>)> {
        self.ensure_accessed()?;

        let index = self.bisect(key)?;
        let not_most_right = index < self.len_keys();

        if not_most_right && self.key_at(index).compare_value(key)? == Ordering::Equal {
            return Ok((self.clone(), Some(index)));
        }

        if self.is_leaf() {
            if not_most_right {
                return Ok((self.clone(), Some(index)));
            }
            return Ok((self.clone(), None));
        }

        let child = self.child_at(index);
        let (node, found) = child.peek_value(key)?;
        if found.is_some() {
            Ok((node, found))
        } else if not_most_right {
            // Nothing at or right of `key` below; the separator above the
            // exhausted child is the closest right match.
            Ok((self.clone(), Some(index)))
        } else {
            Ok((self.clone(), None))
        }
    }

    fn lookup(&self, key: &Value, display: &str) -> ReedResult<(Tree, usize)> {
        let (node, index) = self.peek_value(key)?;
        if let Some(i) = index {
            if node.key_at(i).compare_value(key)? == Ordering::Equal {
                return Ok((node, i));
            }
        }
        Err(key_not_found(display))
    }

    fn find_closest_leaf(&self, key: &Value) -> ReedResult<Tree> {
        let mut current = self.clone();
        loop {
            current.ensure_accessed()?;
            if current.is_leaf() {
                return Ok(current);
            }
            let index = current.bisect(key)?;
            let child = current.child_at(index);
            current = child;
        }
    }

    // == INSERT PATH ==

    fn insert_data(
        &self,
        key_value: &Value,
        key: Data,
        value: Data,
        display: &str,
    ) -> ReedResult<()> {
        let leaf = self.find_closest_leaf(key_value)?;
        let index = leaf.bisect(key_value)?;

        // Duplicate check before any splice, so the failed call leaves the
        // tree untouched.
        if index < leaf.len_keys()
            && leaf.key_at(index).compare_value(key_value)? == Ordering::Equal
        {
            return Err(duplicate_key(display));
        }

        {
            let mut n = leaf.inner.borrow_mut();
            n.keys.insert(index, key);
            n.values.insert(index, value);
            n.modified = true;
        }

        Self::check_after_insert(&leaf)
    }

    fn check_after_insert(node: &Tree) -> ReedResult<()> {
        let mut current = node.clone();
        while current.len_keys() > MAX_KEYS {
            match current.split()? {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(())
    }

    /// Splits an overfull node around its middle key.
    ///
    /// The middle pair is promoted; the left sibling reuses the on-disk
    /// record of the split node, the right sibling is fresh. A splitting
    /// root keeps its own identity and becomes the parent of both halves,
    /// so the handle the caller holds stays the root. Returns the parent
    /// that received the promoted pair, if there is one to re-check.
    fn split(&self) -> ReedResult<Option<Tree>> {
        let mid = MAX_KEYS / 2;
        let pager = self.pager();

        let (
            left_keys,
            left_values,
            left_children,
            middle_key,
            middle_value,
            right_keys,
            right_values,
            right_children,
            parent,
            self_offset,
        ) = {
            let mut n = self.inner.borrow_mut();
            let mut keys = std::mem::take(&mut n.keys);
            let mut values = std::mem::take(&mut n.values);
            let mut children = std::mem::take(&mut n.children);

            let right_keys = keys.split_off(mid + 1);
            let right_values = values.split_off(mid + 1);
            let middle_key = keys
                .pop()
                .ok_or_else(|| corruption("split", "node below split size"))?;
            let middle_value = values
                .pop()
                .ok_or_else(|| corruption("split", "node below split size"))?;

            let (left_children, right_children) = if children.is_empty() {
                (Vec::new(), Vec::new())
            } else {
                let right = children.split_off(mid + 1);
                (children, right)
            };

            let parent = n.parent.as_ref().and_then(Weak::upgrade);
            (
                keys,
                values,
                left_children,
                middle_key,
                middle_value,
                right_keys,
                right_values,
                right_children,
                parent,
                n.offset,
            )
        };

        let left = Tree::fresh(&pager);
        let right = Tree::fresh(&pager);
        left.adopt(left_keys, left_values, left_children);
        right.adopt(right_keys, right_values, right_children);

        match parent {
            None => {
                // Root split: self turns into the new two-child root.
                {
                    let mut n = self.inner.borrow_mut();
                    n.keys = vec![middle_key];
                    n.values = vec![middle_value];
                    n.children = vec![left.clone(), right.clone()];
                    n.modified = true;
                }
                left.set_parent(Some(self));
                right.set_parent(Some(self));
                Ok(None)
            }
            Some(parent_rc) => {
                let parent = Tree { inner: parent_rc };

                // Space re-use: the left half overwrites the old record.
                left.set_offset(self_offset);
                left.set_parent(Some(&parent));
                right.set_parent(Some(&parent));

                let position = parent.position_of(self)?;
                {
                    let mut p = parent.inner.borrow_mut();
                    p.keys.insert(position, middle_key);
                    p.values.insert(position, middle_value);
                    p.children[position] = left.clone();
                    p.children.insert(position + 1, right.clone());
                    p.modified = true;
                }
                Ok(Some(parent))
            }
        }
    }

    // == DELETE PATH ==

    fn find_inorder_predecessor(&self, index: usize) -> ReedResult<Tree> {
        let mut current = self.child_at(index);
        loop {
            current.ensure_accessed()?;
            if current.is_leaf() {
                return Ok(current);
            }
            let last = current.child_count() - 1;
            let child = current.child_at(last);
            current = child;
        }
    }

    fn check_after_delete(node: &Tree) -> ReedResult<()> {
        if node.len_keys() < MIN_KEYS && node.parent().is_some() {
            Self::rebalance(node)?;
        }
        Ok(())
    }

    /// Restores minimum occupancy of an underfull node: borrow from the
    /// adjacent sibling when it has spare keys, merge with it otherwise.
    /// A merge shrinks the parent, which re-checks recursively; a root left
    /// with no keys absorbs its single remaining child so the root handle
    /// keeps its identity.
    fn rebalance(node: &Tree) -> ReedResult<()> {
        let parent = node
            .parent()
            .ok_or_else(|| corruption("rebalance", "underfull node without parent"))?;
        let index = parent.position_of(node)?;

        if index == 0 {
            let right = parent.child_at(1);
            right.ensure_accessed()?;
            if right.len_keys() > MIN_KEYS {
                Self::borrow_from_right(node, &parent, &right);
            } else {
                Self::merge_with_right(node, &parent, &right);
                Self::check_after_delete(&parent)?;
            }
        } else {
            let left = parent.child_at(index - 1);
            left.ensure_accessed()?;
            if left.len_keys() > MIN_KEYS {
                Self::borrow_from_left(node, &parent, &left, index);
            } else {
                Self::merge_with_left(node, &parent, &left, index);
                Self::check_after_delete(&parent)?;
            }
        }

        if parent.len_keys() == 0 && parent.child_count() > 0 {
            Self::collapse_root(&parent)?;
        }
        Ok(())
    }

    fn borrow_from_right(node: &Tree, parent: &Tree, right: &Tree) {
        let (separator_key, separator_value) = {
            let p = parent.inner.borrow();
            (p.keys[0].clone(), p.values[0].clone())
        };
        {
            let mut n = node.inner.borrow_mut();
            n.keys.push(separator_key);
            n.values.push(separator_value);
            n.modified = true;
        }

        if !right.is_leaf() {
            let moved = right.inner.borrow_mut().children.remove(0);
            moved.set_parent(Some(node));
            node.inner.borrow_mut().children.push(moved);
        }

        let (new_separator_key, new_separator_value) = {
            let mut r = right.inner.borrow_mut();
            r.modified = true;
            (r.keys.remove(0), r.values.remove(0))
        };
        {
            let mut p = parent.inner.borrow_mut();
            p.keys[0] = new_separator_key;
            p.values[0] = new_separator_value;
            p.modified = true;
        }
    }

    fn borrow_from_left(node: &Tree, parent: &Tree, left: &Tree, index: usize) {
        let (separator_key, separator_value) = {
            let p = parent.inner.borrow();
            (p.keys[index - 1].clone(), p.values[index - 1].clone())
        };
        {
            let mut n = node.inner.borrow_mut();
            n.keys.insert(0, separator_key);
            n.values.insert(0, separator_value);
            n.modified = true;
        }

        if !left.is_leaf() {
            let moved = {
                let mut l = left.inner.borrow_mut();
                let last = l.children.len() - 1;
                l.children.remove(last)
            };
            moved.set_parent(Some(node));
            node.inner.borrow_mut().children.insert(0, moved);
        }

        let (new_separator_key, new_separator_value) = {
            let mut l = left.inner.borrow_mut();
            l.modified = true;
            let key = l.keys.pop().expect("sibling lent its last key");
            let value = l.values.pop().expect("sibling lent its last key");
            (key, value)
        };
        {
            let mut p = parent.inner.borrow_mut();
            p.keys[index - 1] = new_separator_key;
            p.values[index - 1] = new_separator_value;
            p.modified = true;
        }
    }

    fn merge_with_right(node: &Tree, parent: &Tree, right: &Tree) {
        let (right_keys, right_values, right_children) = {
            let mut r = right.inner.borrow_mut();
            (
                std::mem::take(&mut r.keys),
                std::mem::take(&mut r.values),
                std::mem::take(&mut r.children),
            )
        };
        let (separator_key, separator_value) = {
            let p = parent.inner.borrow();
            (p.keys[0].clone(), p.values[0].clone())
        };

        {
            let mut n = node.inner.borrow_mut();
            n.keys.push(separator_key);
            n.values.push(separator_value);
            n.keys.extend(right_keys);
            n.values.extend(right_values);
            n.children.extend(right_children.iter().cloned());
            n.modified = true;
        }
        for child in &right_children {
            child.set_parent(Some(node));
        }

        {
            let mut p = parent.inner.borrow_mut();
            p.keys.remove(0);
            p.values.remove(0);
            p.children.remove(1);
            p.modified = true;
        }
    }

    fn merge_with_left(node: &Tree, parent: &Tree, left: &Tree, index: usize) {
        let (left_keys, left_values, left_children) = {
            let mut l = left.inner.borrow_mut();
            (
                std::mem::take(&mut l.keys),
                std::mem::take(&mut l.values),
                std::mem::take(&mut l.children),
            )
        };
        let (separator_key, separator_value) = {
            let p = parent.inner.borrow();
            (p.keys[index - 1].clone(), p.values[index - 1].clone())
        };

        {
            let mut n = node.inner.borrow_mut();
            let mut keys = left_keys;
            keys.push(separator_key);
            keys.append(&mut n.keys);
            n.keys = keys;

            let mut values = left_values;
            values.push(separator_value);
            values.append(&mut n.values);
            n.values = values;

            let mut children = left_children.clone();
            children.append(&mut n.children);
            n.children = children;
            n.modified = true;
        }
        for child in &left_children {
            child.set_parent(Some(node));
        }

        {
            let mut p = parent.inner.borrow_mut();
            p.keys.remove(index - 1);
            p.values.remove(index - 1);
            p.children.remove(index - 1);
            p.modified = true;
        }
    }

    /// A root that lost its last separator absorbs its single remaining
    /// child, keeping its own identity as the root.
    fn collapse_root(root: &Tree) -> ReedResult<()> {
        let child = root.child_at(0);
        child.ensure_accessed()?;

        let (keys, values, children) = {
            let mut c = child.inner.borrow_mut();
            (
                std::mem::take(&mut c.keys),
                std::mem::take(&mut c.values),
                std::mem::take(&mut c.children),
            )
        };
        {
            let mut r = root.inner.borrow_mut();
            r.keys = keys;
            r.values = values;
            r.children = children.clone();
            r.modified = true;
        }
        for grandchild in &children {
            grandchild.set_parent(Some(root));
        }
        Ok(())
    }

    // == FREEZE ==

    /// Post-order flush. Returns the on-disk position of this node.
    pub(crate) fn freeze_node(&self) -> ReedResult<u64> {
        {
            let n = self.inner.borrow();
            if !n.accessed {
                // Never pulled into memory, so nothing below changed either.
                return n
                    .offset
                    .ok_or_else(|| corruption("freeze", "unaccessed node without position"));
            }
        }

        // Values whose cache holds an in-memory structure carry pending
        // mutations of their own; settle them first.
        let values = self.values_snapshot();
        for value in &values {
            match value.cached_value() {
                Some(Value::Tree(subtree)) => {
                    subtree.freeze_node()?;
                }
                Some(Value::Array(array)) => {
                    array.freeze()?;
                }
                _ => {}
            }
        }

        let children = self.children_snapshot();
        let mut child_offsets = Vec::with_capacity(children.len());
        for child in &children {
            child_offsets.push(child.freeze_node()?);
        }

        let pager = self.pager();
        let target = {
            let mut n = self.inner.borrow_mut();
            match n.offset {
                Some(position) => position,
                None => {
                    let position = pager.borrow_mut().seek_end()?;
                    n.offset = Some(position);
                    position
                }
            }
        };

        if !self.inner.borrow().modified {
            return Ok(target);
        }

        let layout = {
            let n = self.inner.borrow();
            NodeLayout {
                keys: n.keys.iter().map(Data::offset).collect(),
                values: n.values.iter().map(Data::offset).collect(),
                children: child_offsets,
            }
        };
        {
            let mut p = pager.borrow_mut();
            p.seek_to(target)?;
            layout.dump(&mut *p)?;
        }
        self.inner.borrow_mut().modified = false;
        Ok(target)
    }

    // == SHARED INTERNALS ==

    pub(crate) fn pager(&self) -> SharedPager {
        self.inner.borrow().pager.clone()
    }

    fn set_offset(&self, offset: Option<u64>) {
        self.inner.borrow_mut().offset = offset;
    }

    pub(crate) fn parent(&self) -> Option<Tree> {
        let upgraded = {
            let n = self.inner.borrow();
            n.parent.as_ref().and_then(Weak::upgrade)
        };
        upgraded.map(|inner| Tree { inner })
    }

    fn set_parent(&self, parent: Option<&Tree>) {
        self.inner.borrow_mut().parent = parent.map(|t| Rc::downgrade(&t.inner));
    }

    fn adopt(&self, keys: Vec<Data>, values: Vec<Data>, children: Vec<Tree>) {
        {
            let mut n = self.inner.borrow_mut();
            n.keys = keys;
            n.values = values;
            n.children = children.clone();
        }
        for child in &children {
            child.set_parent(Some(self));
        }
    }

    /// Child slot this node occupies in its parent, by handle identity.
    pub(crate) fn position_of(&self, child: &Tree) -> ReedResult<usize> {
        self.inner
            .borrow()
            .children
            .iter()
            .position(|c| Rc::ptr_eq(&c.inner, &child.inner))
            .ok_or_else(|| corruption("tree", "node missing from its parent"))
    }

    /// Valid only after access; an unaccessed node reports leaf.
    pub(crate) fn is_leaf(&self) -> bool {
        let n = self.inner.borrow();
        debug_assert!(n.accessed, "is_leaf on unaccessed node");
        n.children.is_empty()
    }

    pub(crate) fn len_keys(&self) -> usize {
        self.inner.borrow().keys.len()
    }

    pub(crate) fn key_at(&self, index: usize) -> Data {
        self.inner.borrow().keys[index].clone()
    }

    pub(crate) fn value_at(&self, index: usize) -> Data {
        self.inner.borrow().values[index].clone()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    pub(crate) fn child_at(&self, index: usize) -> Tree {
        self.inner.borrow().children[index].clone()
    }

    pub(crate) fn keys_snapshot(&self) -> Vec<Data> {
        self.inner.borrow().keys.clone()
    }

    pub(crate) fn values_snapshot(&self) -> Vec<Data> {
        self.inner.borrow().values.clone()
    }

    pub(crate) fn children_snapshot(&self) -> Vec<Tree> {
        self.inner.borrow().children.clone()
    }

    /// Re-binds the root to a new on-disk position and reloads it. Used
    /// after vacuum replaced the file underneath.
    pub(crate) fn reseat(&self, offset: u64) -> ReedResult<()> {
        {
            let mut n = self.inner.borrow_mut();
            n.offset = Some(offset);
            n.modified = false;
        }
        self.access()
    }

    /// Handle identity.
    pub fn same_node(a: &Tree, b: &Tree) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(n) => write!(
                f,
                "Tree(offset={:?}, keys={}, children={}, accessed={}, modified={})",
                n.offset,
                n.keys.len(),
                n.children.len(),
                n.accessed,
                n.modified
            ),
            Err(_) => write!(f, "Tree(<borrowed>)"),
        }
    }
}

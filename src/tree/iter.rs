// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Lazy in-order iteration over a tree.
//!
//! The iterator keeps an explicit stack of (node, position) frames instead
//! of recursing, which lets a range scan resume from the position `peek`
//! found and ascend through parents exactly like a suspended in-order
//! traversal would. Children are pulled from disk only when the walk
//! reaches them.
//!
//! A range's upper bound is exclusive and recognised by reference identity:
//! interning guarantees the bound position and the traversal hand out the
//! same `Data` object, so no key comparison happens while iterating.

use std::cmp::Ordering;

use crate::data::value::NewValue;
use crate::data::Data;
use crate::error::{corruption, unsupported_type, ReedResult};

use super::node::Tree;

struct Frame {
    node: Tree,
    /// Forward: next key index to yield. Reverse: number of keys still to
    /// yield (index `next - 1` comes out first).
    next: usize,
}

/// Lazy sequence of (key, value) reference pairs in key order.
///
/// Yields `ReedResult` items, since walking into a not-yet-loaded child can
/// hit the disk; a failed load ends the iteration after surfacing the
/// error.
pub struct Items {
    stack: Vec<Frame>,
    stop: Option<Data>,
    reverse: bool,
}

impl Tree {
    /// Full in-order traversal of this tree.
    ///
    /// ## Input
    /// - `reverse`: descending key order when true
    ///
    /// ## Example Usage
    /// ```rust,no_run
    /// # let mut db = reedtree::Database::open("x.reedtree")?;
    /// # let root = db.connect()?;
    /// for pair in root.items(false)? {
    ///     let (key, value) = pair?;
    ///     println!("{:?} -> {:?}", key.get_cached()?, value.get()?);
    /// }
    /// # Ok::<(), reedtree::ReedError>(())
    /// ```
    pub fn items(&self, reverse: bool) -> ReedResult<Items> {
        self.ensure_accessed()?;
        let mut items = Items {
            stack: Vec::new(),
            stop: None,
            reverse,
        };
        if reverse {
            items.descend_last(self.clone())?;
        } else {
            items.descend_first(self.clone())?;
        }
        Ok(items)
    }

    /// Scan from `start` towards `stop`, `stop` exclusive.
    ///
    /// ## Input
    /// - `start`: first key of the scan; when absent, the scan begins at
    ///   the closest key on the scanned side
    /// - `stop`: excluded bound; when past the end of the tree, the scan
    ///   runs to completion
    /// - `reverse`: descending scan when true (`start` is then the upper
    ///   key)
    ///
    /// ## Error Conditions
    /// - `ReedError::UnsupportedType` when a bound is not a primitive
    pub fn range<A, B>(&self, start: A, stop: B, reverse: bool) -> ReedResult<Items>
    where
        A: Into<NewValue>,
        B: Into<NewValue>,
    {
        let start = start.into();
        let stop = stop.into();
        let start_value = start
            .to_value()
            .ok_or_else(|| unsupported_type("range bounds must be primitive"))?;
        let stop_value = stop
            .to_value()
            .ok_or_else(|| unsupported_type("range bounds must be primitive"))?;

        self.ensure_accessed()?;

        let (stop_node, stop_index) = self.peek_value(&stop_value)?;
        let stop_data = stop_index.map(|i| stop_node.key_at(i));

        let mut items = Items {
            stack: Vec::new(),
            stop: stop_data,
            reverse,
        };

        let (node, index) = self.peek_value(&start_value)?;
        if !reverse {
            if let Some(i) = index {
                items.stack = continuation(self, &node, i)?;
            }
            // No closest-right match: every key is below `start`, the
            // forward scan has nothing to yield.
        } else {
            match index {
                Some(i) => {
                    let exact =
                        node.key_at(i).compare_value(&start_value)? == Ordering::Equal;
                    if exact {
                        items.stack = continuation(self, &node, i + 1)?;
                    } else {
                        // keys[i] is the first key above `start` and stays
                        // out; the subtree left of it is still in range.
                        items.stack = continuation(self, &node, i)?;
                        if !node.is_leaf() {
                            items.descend_last(node.child_at(i))?;
                        }
                    }
                }
                // Everything is below `start`: the whole tree, descending.
                None => items.descend_last(self.clone())?,
            }
        }

        Ok(items)
    }
}

/// Stack for resuming an in-order walk at (node, next): the target frame on
/// top, ancestors below it, each positioned at the child branch the walk
/// came through.
fn continuation(root: &Tree, node: &Tree, next: usize) -> ReedResult<Vec<Frame>> {
    let mut frames = vec![Frame {
        node: node.clone(),
        next,
    }];
    let mut current = node.clone();
    while !Tree::same_node(&current, root) {
        let parent = current
            .parent()
            .ok_or_else(|| corruption("range", "node detached from the traversal root"))?;
        let branch = parent.position_of(&current)?;
        frames.push(Frame {
            node: parent.clone(),
            next: branch,
        });
        current = parent;
    }
    frames.reverse();
    Ok(frames)
}

impl Items {
    /// Pushes `node` and its leftmost descent chain.
    fn descend_first(&mut self, node: Tree) -> ReedResult<()> {
        let mut current = node;
        loop {
            current.ensure_accessed()?;
            self.stack.push(Frame {
                node: current.clone(),
                next: 0,
            });
            if current.is_leaf() {
                return Ok(());
            }
            let child = current.child_at(0);
            current = child;
        }
    }

    /// Pushes `node` and its rightmost descent chain.
    fn descend_last(&mut self, node: Tree) -> ReedResult<()> {
        let mut current = node;
        loop {
            current.ensure_accessed()?;
            self.stack.push(Frame {
                node: current.clone(),
                next: current.len_keys(),
            });
            if current.is_leaf() {
                return Ok(());
            }
            let child = current.child_at(current.child_count() - 1);
            current = child;
        }
    }

    fn next_forward(&mut self) -> Option<ReedResult<(Data, Data)>> {
        loop {
            let step = match self.stack.last_mut() {
                None => return None,
                Some(frame) => {
                    if frame.next < frame.node.len_keys() {
                        let index = frame.next;
                        frame.next += 1;
                        Some((frame.node.clone(), index))
                    } else {
                        None
                    }
                }
            };

            let Some((node, index)) = step else {
                self.stack.pop();
                continue;
            };

            let key = node.key_at(index);
            let value = node.value_at(index);

            if let Some(stop) = &self.stop {
                if stop.same_as(&key) {
                    self.stack.clear();
                    return None;
                }
            }

            if !node.is_leaf() {
                if let Err(e) = self.descend_first(node.child_at(index + 1)) {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
            return Some(Ok((key, value)));
        }
    }

    fn next_reverse(&mut self) -> Option<ReedResult<(Data, Data)>> {
        loop {
            let step = match self.stack.last_mut() {
                None => return None,
                Some(frame) => {
                    if frame.next > 0 {
                        frame.next -= 1;
                        Some((frame.node.clone(), frame.next))
                    } else {
                        None
                    }
                }
            };

            let Some((node, index)) = step else {
                self.stack.pop();
                continue;
            };

            let key = node.key_at(index);
            let value = node.value_at(index);

            if let Some(stop) = &self.stop {
                if stop.same_as(&key) {
                    self.stack.clear();
                    return None;
                }
            }

            if !node.is_leaf() {
                if let Err(e) = self.descend_last(node.child_at(index)) {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
            return Some(Ok((key, value)));
        }
    }
}

impl Iterator for Items {
    type Item = ReedResult<(Data, Data)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reverse {
            self.next_reverse()
        } else {
            self.next_forward()
        }
    }
}

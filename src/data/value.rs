// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Decoded values and the literals that create new ones.
//!
//! `Value` is what a `Data` reference decodes to; `NewValue` is what callers
//! hand in. The split exists because nested containers behave differently in
//! each direction: decoding a tree or array yields a live handle, while a
//! `Map` or `List` literal describes a structure still to be written.

use std::cmp::Ordering;

use crate::array::Array;
use crate::error::{unsupported_type, ReedResult};
use crate::format::TypeCode;
use crate::tree::Tree;

use super::reference::Data;

/// A decoded stored value.
///
/// Tree and array variants are live handles sharing state with every other
/// holder of the same reference; cloning them is cheap and does not copy
/// the underlying structure.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Number(f32),
    Tree(Tree),
    Empty,
    Boolean(bool),
    Bytes(Vec<u8>),
    Array(Array),
}

impl Value {
    /// Tag this value is encoded under.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::String(_) => TypeCode::String,
            Self::Number(_) => TypeCode::Number,
            Self::Tree(_) => TypeCode::Tree,
            Self::Empty => TypeCode::Empty,
            Self::Boolean(_) => TypeCode::Boolean,
            Self::Bytes(_) => TypeCode::Bytes,
            Self::Array(_) => TypeCode::Array,
        }
    }

    /// Returns the string payload, if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a Number.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a Boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the raw bytes, if this is a Bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the nested tree handle, if this is a Tree.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the array handle, if this is an Array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this is the Empty value.
    pub fn is_empty_value(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Total order over key-capable values.
    ///
    /// Same-type comparison is the natural one: strings and bytes compare
    /// lexicographically by their bytes, numbers by `total_cmp`, booleans
    /// with false before true. Values of different types order by tag rank.
    /// Trees and arrays have no ordering and are rejected.
    pub(crate) fn compare(&self, other: &Value) -> ReedResult<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Ok(a.cmp(b)),
            (Self::Number(a), Self::Number(b)) => Ok(a.total_cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Ok(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Ok(a.cmp(b)),
            (Self::Empty, Self::Empty) => Ok(Ordering::Equal),
            (Self::Tree(_), _) | (_, Self::Tree(_)) | (Self::Array(_), _) | (_, Self::Array(_)) => {
                Err(unsupported_type("trees and arrays have no key ordering"))
            }
            _ => Ok(self.type_code().as_u8().cmp(&other.type_code().as_u8())),
        }
    }
}

/// Equality for primitives is by payload; tree and array handles compare by
/// identity, since two handles to the same structure share state anyway.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Empty, Self::Empty) => true,
            (Self::Tree(a), Self::Tree(b)) => Tree::same_node(a, b),
            (Self::Array(a), Self::Array(b)) => Array::same_array(a, b),
            _ => false,
        }
    }
}

/// A value to be stored.
///
/// Primitives convert via `From`; a `List` becomes an on-disk array, a `Map`
/// becomes a nested tree with its entries inserted recursively, and
/// `Existing` reuses an already-written blob, which is how a value moves
/// under a new key without being copied.
#[derive(Debug, Clone)]
pub enum NewValue {
    String(String),
    Number(f32),
    Boolean(bool),
    Bytes(Vec<u8>),
    Empty,
    List(Vec<NewValue>),
    Map(Vec<(NewValue, NewValue)>),
    Existing(Data),
}

impl NewValue {
    /// The decoded form of a primitive literal. Containers and existing
    /// references return None; they cannot serve as keys.
    pub(crate) fn to_value(&self) -> Option<Value> {
        match self {
            Self::String(s) => Some(Value::String(s.clone())),
            Self::Number(n) => Some(Value::Number(*n)),
            Self::Boolean(b) => Some(Value::Boolean(*b)),
            Self::Bytes(b) => Some(Value::Bytes(b.clone())),
            Self::Empty => Some(Value::Empty),
            Self::List(_) | Self::Map(_) | Self::Existing(_) => None,
        }
    }

    /// Short human-readable form for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
            Self::Empty => "<empty>".to_string(),
            Self::List(_) => "<array>".to_string(),
            Self::Map(_) => "<tree>".to_string(),
            Self::Existing(d) => format!("<data at {}>", d.offset()),
        }
    }
}

impl From<&str> for NewValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NewValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f32> for NewValue {
    fn from(n: f32) -> Self {
        Self::Number(n)
    }
}

impl From<f64> for NewValue {
    fn from(n: f64) -> Self {
        Self::Number(n as f32)
    }
}

impl From<i32> for NewValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f32)
    }
}

impl From<i64> for NewValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f32)
    }
}

impl From<u32> for NewValue {
    fn from(n: u32) -> Self {
        Self::Number(n as f32)
    }
}

impl From<bool> for NewValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<u8>> for NewValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for NewValue {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<Data> for NewValue {
    fn from(d: Data) -> Self {
        Self::Existing(d)
    }
}

impl From<Vec<NewValue>> for NewValue {
    fn from(items: Vec<NewValue>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<(NewValue, NewValue)>> for NewValue {
    fn from(entries: Vec<(NewValue, NewValue)>) -> Self {
        Self::Map(entries)
    }
}

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Typed values and the lazy references that point at them.
//!
//! Every key and value stored in a B-node is reached through a `Data`
//! reference: an offset into the file with an optional cache of the decoded
//! payload. References are interned per file, so two lookups of the same
//! offset hand back the same live object and mutations made through one are
//! observed by all holders.

pub mod read;
pub mod reference;
pub mod value;
pub mod write;

pub use reference::Data;
pub use value::{NewValue, Value};

#[cfg(test)]
mod reference_test;
#[cfg(test)]
mod write_test;

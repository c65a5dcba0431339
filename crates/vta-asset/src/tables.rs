//! Interning Tables
//!
//! Stable dedup: the first occurrence of a value wins its index and every
//! repeat reuses it. An index never changes meaning once assigned.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::{DimensionRecord, DimensionUnit, Rgba};

/// Which table an index points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Strings,
    Colors,
    Floats,
    Dimensions,
    Rules,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strings => "string",
            Self::Colors => "color",
            Self::Floats => "float",
            Self::Dimensions => "dimension",
            Self::Rules => "rule",
        })
    }
}

/// Table lookup failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{table} index {index} is out of range")]
    UnresolvedIndex { table: TableKind, index: u32 },
}

/// A value that can live in an interning table.
///
/// Floats are keyed by bit pattern so `-0.0` and `0.0` stay distinct and
/// every key is `Eq`.
pub trait Internable: Clone {
    type Key: Eq + Hash;

    fn key(&self) -> Self::Key;
}

impl Internable for String {
    type Key = String;

    fn key(&self) -> String {
        self.clone()
    }
}

impl Internable for f32 {
    type Key = u32;

    fn key(&self) -> u32 {
        self.to_bits()
    }
}

impl Internable for Rgba {
    type Key = [u32; 4];

    fn key(&self) -> [u32; 4] {
        [self.r.to_bits(), self.g.to_bits(), self.b.to_bits(), self.a.to_bits()]
    }
}

impl Internable for DimensionRecord {
    type Key = (u32, DimensionUnit);

    fn key(&self) -> (u32, DimensionUnit) {
        (self.value.to_bits(), self.unit)
    }
}

/// Value → index and index → value, built once per import
#[derive(Debug, Clone)]
pub struct Interner<T: Internable> {
    values: Vec<T>,
    lookup: HashMap<T::Key, u32>,
}

impl<T: Internable> Default for Interner<T> {
    fn default() -> Self {
        Self { values: Vec::new(), lookup: HashMap::new() }
    }
}

impl<T: Internable> Interner<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `value`, assigning the next one on first sight
    pub fn intern(&mut self, value: T) -> u32 {
        let key = value.key();
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.values.len() as u32;
        self.values.push(value);
        self.lookup.insert(key, index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.values.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

impl Interner<String> {
    pub fn intern_str(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.lookup.get(value) {
            return index;
        }
        self.intern(value.to_string())
    }
}

//! In-memory parameter store.
//!
//! [`ParamTable`] keeps every `(key, coordinate)` pair in an ordered map.
//! Engines can embed it as their parameter store, and tests use it to observe
//! exactly what ingestion wrote.
use std::collections::BTreeMap;

use crate::engine::params::{Coord, ParamKey, ParamValue, ParameterStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    values: BTreeMap<(ParamKey, Coord), ParamValue>,
}

impl ParamTable {
    pub fn new() -> ParamTable {
        ParamTable::default()
    }

    pub fn get(&self, key: ParamKey, at: impl Into<Coord>) -> Option<ParamValue> {
        self.values.get(&(key, at.into())).copied()
    }

    /// Real value at `at`, `None` if absent or not real.
    pub fn real(&self, key: ParamKey, at: impl Into<Coord>) -> Option<f64> {
        self.get(key, at).and_then(ParamValue::as_real)
    }

    pub fn int(&self, key: ParamKey, at: impl Into<Coord>) -> Option<i32> {
        self.get(key, at).and_then(ParamValue::as_int)
    }

    pub fn flag(&self, key: ParamKey, at: impl Into<Coord>) -> Option<bool> {
        self.get(key, at).and_then(ParamValue::as_flag)
    }

    /// Number of coordinates set for `key`.
    pub fn count(&self, key: ParamKey) -> usize {
        self.entries(key).count()
    }

    /// Entries of `key` in coordinate order.
    pub fn entries(&self, key: ParamKey) -> impl Iterator<Item = (Coord, ParamValue)> + '_ {
        self.values.iter().filter(move |((k, _), _)| *k == key).map(|((_, c), v)| (*c, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl ParameterStore for ParamTable {
    fn set(&mut self, key: ParamKey, at: Coord, value: ParamValue) {
        self.values.insert((key, at), value);
    }
}

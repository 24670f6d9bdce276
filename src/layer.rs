//! A single transaction layer
//!
//! A layer records only what changed relative to the layer below it: the keys
//! written while it was on top, and the net change in how many keys hold each
//! value. Beginning a transaction therefore costs one empty layer, never a copy
//! of the key space.

use std::collections::HashMap;

/// Overlay value marking a key deleted in this layer.
pub const TOMBSTONE: &str = "";

/// Key overlay plus value-count delta for one level of the transaction stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    overlay: HashMap<String, String>,
    count_delta: HashMap<String, i64>,
}

impl Layer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Value recorded for `key` in this layer only.
    ///
    /// `Some("")` is a tombstone and still counts as a hit.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.overlay.get(key).map(String::as_str)
    }

    /// Net count change for `value` in this layer only
    pub fn delta(&self, value: &str) -> i64 {
        self.count_delta.get(value).copied().unwrap_or(0)
    }

    /// Record `key = value` in the overlay, shadowing any lower layer
    pub fn write(&mut self, key: String, value: String) {
        self.overlay.insert(key, value);
    }

    /// Shift the count delta of `value` by `by`.
    ///
    /// The empty string is never counted. Entries that net out to zero are
    /// dropped so long-lived layers don't accumulate dead values.
    pub fn adjust(&mut self, value: &str, by: i64) {
        if value == TOMBSTONE || by == 0 {
            return;
        }
        let entry = self.count_delta.entry(value.to_string()).or_insert(0);
        *entry += by;
        if *entry == 0 {
            self.count_delta.remove(value);
        }
    }

    /// Copy every overlay entry of `other` over this layer's entries
    pub fn absorb_overlay(&mut self, other: &Layer) {
        for (key, value) in &other.overlay {
            self.overlay.insert(key.clone(), value.clone());
        }
    }

    /// Add every count delta of `other` into this layer's deltas
    pub fn absorb_counts(&mut self, other: &Layer) {
        for (value, by) in &other.count_delta {
            self.adjust(value, *by);
        }
    }

    /// Number of keys recorded in this layer, tombstones included
    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }
}

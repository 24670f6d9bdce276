//! Transactional key-value store built from stacked delta layers
//!
//! The root layer holds the committed state. Every BEGIN pushes an empty
//! layer on top; reads walk the stack from the top down, writes only touch the
//! top. ROLLBACK drops the top layer, COMMIT folds it downward according to the
//! configured [`CommitPolicy`].

use crate::error::{NestKvError, Result};
use crate::layer::{Layer, TOMBSTONE};
use serde::{Deserialize, Serialize};
use std::iter;
use tracing::debug;

/// Trait defining the interface for transactional key-value operations
pub trait Store: Send {
    /// Set a key-value pair in the active transaction
    fn set(&mut self, key: String, value: String) -> Result<()>;

    /// Get the value a key resolves to.
    ///
    /// A deleted key resolves to the empty string until the deletion is
    /// rolled back.
    fn get(&self, key: &str) -> Result<String>;

    /// Delete a key; fails if the key does not resolve
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Number of keys currently resolving to `value`
    fn count(&self, value: &str) -> i64;

    /// Open a nested transaction
    fn begin(&mut self) -> Result<()>;

    /// Discard the innermost transaction
    fn rollback(&mut self) -> Result<()>;

    /// Make the innermost transaction's changes permanent
    fn commit(&mut self) -> Result<()>;

    /// Drop all data and all open transactions
    fn reset(&mut self);

    /// Number of open transactions
    fn depth(&self) -> usize;
}

/// How COMMIT folds a nested transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Write the innermost overlay straight into the root and fold every
    /// open layer's count delta down into it. All transactions close at once.
    ///
    /// Overlay entries of intermediate layers are not carried to the root, so
    /// a commit issued at depth 2 or more loses their key writes while keeping
    /// their count changes.
    #[default]
    CollapseToRoot,
    /// Merge the innermost layer into its immediate parent and close only
    /// that transaction.
    Cascade,
}

/// In-memory store with nested transactions
#[derive(Debug, Clone, Default)]
pub struct LayeredStore {
    root: Layer,
    nested: Vec<Layer>,
    policy: CommitPolicy,
}

impl LayeredStore {
    /// Create an empty store using the default commit policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an explicit commit policy
    pub fn with_policy(policy: CommitPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    /// Layers from the active one down to the root
    fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.nested.iter().rev().chain(iter::once(&self.root))
    }

    fn current_mut(&mut self) -> &mut Layer {
        match self.nested.last_mut() {
            Some(layer) => layer,
            None => &mut self.root,
        }
    }

    /// Nearest overlay entry for `key`, tombstones included
    fn resolve(&self, key: &str) -> Option<&str> {
        self.layers().find_map(|layer| layer.lookup(key))
    }
}

impl Store for LayeredStore {
    fn set(&mut self, key: String, value: String) -> Result<()> {
        // The old value's count is retracted on the active layer, whichever
        // layer it was read from.
        let previous = self.resolve(&key).map(str::to_string);
        debug!(key = %key, previous = ?previous, value = %value, depth = self.depth(), "set");

        let current = self.current_mut();
        if let Some(old) = previous {
            current.adjust(&old, -1);
        }
        current.adjust(&value, 1);
        current.write(key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<String> {
        self.resolve(key)
            .map(str::to_string)
            .ok_or_else(|| NestKvError::KeyNotFound(key.to_string()))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let original = self.get(key)?;
        debug!(key = %key, original = %original, "delete");
        self.set(key.to_string(), TOMBSTONE.to_string())
    }

    fn count(&self, value: &str) -> i64 {
        if value == TOMBSTONE {
            return 0;
        }
        self.layers().map(|layer| layer.delta(value)).sum()
    }

    fn begin(&mut self) -> Result<()> {
        self.nested.push(Layer::new());
        debug!(depth = self.depth(), "begin");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let discarded = self
            .nested
            .pop()
            .ok_or(NestKvError::NoActiveTransaction)?;
        debug!(depth = self.depth(), discarded_keys = discarded.len(), "rollback");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let top = self
            .nested
            .pop()
            .ok_or(NestKvError::NoActiveTransaction)?;

        match self.policy {
            CommitPolicy::CollapseToRoot => {
                self.root.absorb_overlay(&top);

                // Walk down the stack adding each layer's deltas into the one
                // below, so the root ends up with the accumulated sum.
                let mut carry = top;
                while let Some(mut below) = self.nested.pop() {
                    below.absorb_counts(&carry);
                    carry = below;
                }
                self.root.absorb_counts(&carry);
            }
            CommitPolicy::Cascade => {
                let parent = self.current_mut();
                parent.absorb_overlay(&top);
                parent.absorb_counts(&top);
            }
        }

        debug!(policy = ?self.policy, depth = self.depth(), "commit");
        Ok(())
    }

    fn reset(&mut self) {
        self.root = Layer::new();
        self.nested.clear();
    }

    fn depth(&self) -> usize {
        self.nested.len()
    }
}

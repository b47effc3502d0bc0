//! Layered in-memory key-value store with nested transactions
//!
//! Committed data lives in a base map. Every `begin` pushes a transaction
//! layer on top of it; reads resolve a key from the innermost layer outward
//! and stop at the first layer that mentions it, either with a value or with
//! a tombstone.

use crate::error::{LayerKvError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Trait defining the interface for transactional key-value operations
pub trait Store {
    /// Set a key-value pair in the current writable layer
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Get the effective value of a key
    fn get(&self, key: &str) -> Option<&str>;

    /// Delete a key from the current writable layer
    fn delete(&mut self, key: &str);

    /// Count distinct keys whose effective value equals `value`
    fn count_equal_to(&self, value: &str) -> usize;

    /// Open a new (possibly nested) transaction
    fn begin(&mut self);

    /// Discard the innermost transaction
    fn rollback(&mut self) -> Result<()>;

    /// Merge every open transaction into the committed data
    fn commit(&mut self) -> Result<()>;

    /// Number of open transactions
    fn depth(&self) -> usize;
}

/// A key's state inside a single transaction layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Present(String),
    Tombstone,
}

/// Uncommitted writes and deletes made since one `begin`.
///
/// A key missing from `entries` means the layer does not mention it.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    entries: HashMap<String, Entry>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// This layer's own entry for `key`
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn merge_into(self, base: &mut HashMap<String, String>) {
        for (key, entry) in self.entries {
            match entry {
                Entry::Present(value) => {
                    base.insert(key, value);
                }
                Entry::Tombstone => {
                    base.remove(&key);
                }
            }
        }
    }
}

/// Resolve `key` through `layers` (innermost last) and then `base`.
fn resolve<'a>(
    base: &'a HashMap<String, String>,
    layers: &'a [Layer],
    key: &str,
) -> Option<&'a str> {
    for layer in layers.iter().rev() {
        match layer.entries.get(key) {
            Some(Entry::Present(value)) => return Some(value.as_str()),
            Some(Entry::Tombstone) => return None,
            None => {}
        }
    }
    base.get(key).map(String::as_str)
}

/// Effective mapping of `base` with `layers` applied outermost first.
fn overlay<'a>(
    base: &'a HashMap<String, String>,
    layers: &'a [Layer],
) -> HashMap<&'a str, &'a str> {
    let mut view: HashMap<&str, &str> = base
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();

    for layer in layers {
        for (key, entry) in &layer.entries {
            match entry {
                Entry::Present(value) => {
                    view.insert(key.as_str(), value.as_str());
                }
                Entry::Tombstone => {
                    view.remove(key.as_str());
                }
            }
        }
    }
    view
}

/// Single-session transactional store.
///
/// Not internally synchronized: a host sharing one instance across threads
/// must serialize access itself.
#[derive(Debug, Clone, Default)]
pub struct TransactionalStore {
    base: HashMap<String, String>,
    stack: Vec<Layer>,
}

impl TransactionalStore {
    /// Create an empty store with no open transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one transaction is open
    pub fn in_transaction(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The full effective key-value mapping, sorted by key
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        overlay(&self.base, &self.stack)
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Number of effectively visible keys
    pub fn len(&self) -> usize {
        if self.stack.is_empty() {
            self.base.len()
        } else {
            overlay(&self.base, &self.stack).len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed data only, ignoring open transactions
    pub fn committed(&self, key: &str) -> Option<&str> {
        self.base.get(key).map(String::as_str)
    }

    /// The innermost open transaction layer
    pub fn current_layer(&self) -> Option<&Layer> {
        self.stack.last()
    }
}

impl Store for TransactionalStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() || value.is_empty() {
            warn!(key, value, "rejected set with missing key or value");
            return Err(LayerKvError::InvalidArgument(
                "set requires a non-empty key and value".to_string(),
            ));
        }

        match self.stack.last_mut() {
            Some(layer) => {
                layer
                    .entries
                    .insert(key.to_string(), Entry::Present(value.to_string()));
            }
            None => {
                self.base.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&str> {
        resolve(&self.base, &self.stack, key)
    }

    fn delete(&mut self, key: &str) {
        match self.stack.split_last_mut() {
            None => {
                self.base.remove(key);
            }
            Some((top, below)) => {
                // An outer layer still sees the key, so it must be shadowed here.
                if resolve(&self.base, below, key).is_some() {
                    top.entries.insert(key.to_string(), Entry::Tombstone);
                } else {
                    top.entries.remove(key);
                }
            }
        }
    }

    fn count_equal_to(&self, value: &str) -> usize {
        if self.stack.is_empty() {
            return self.base.values().filter(|v| v.as_str() == value).count();
        }
        overlay(&self.base, &self.stack)
            .values()
            .filter(|v| **v == value)
            .count()
    }

    fn begin(&mut self) {
        self.stack.push(Layer::new());
        debug!(depth = self.stack.len(), "transaction started");
    }

    fn rollback(&mut self) -> Result<()> {
        let layer = self.stack.pop().ok_or(LayerKvError::NoActiveTransaction)?;
        debug!(
            depth = self.stack.len(),
            discarded = layer.len(),
            "transaction rolled back"
        );
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(LayerKvError::NoActiveTransaction);
        }

        // Commit flattens every open transaction, not just the innermost.
        let layers = self.stack.len();
        for layer in self.stack.drain(..) {
            layer.merge_into(&mut self.base);
        }
        debug!(layers, keys = self.base.len(), "transactions committed");
        Ok(())
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

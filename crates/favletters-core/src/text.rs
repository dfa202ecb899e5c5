//! Shared text register and its durable store.

use std::collections::HashMap;

use crate::error::Result;

/// The single shared text value.
///
/// Merge rule is last-write-wins by arrival order: whatever was applied most
/// recently is the value, with no causal check. Local edits always win
/// locally; remote values are adopted iff they differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedText {
    value: String,
}

impl SharedText {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Apply a local edit unconditionally.
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Apply a remote value. Returns true if it was adopted.
    pub fn merge_remote(&mut self, incoming: &str) -> bool {
        if incoming == self.value {
            return false;
        }
        self.value = incoming.to_string();
        true
    }

    /// Character at a rank position, if the text is that long.
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.value.chars().nth(index)
    }
}

/// Durable key/value storage for the text.
///
/// Storage is an optimization: the engine treats every failure as
/// recoverable and keeps running on its in-memory value.
pub trait TextStore: Send {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: TextStore + ?Sized> TextStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// In-memory store. Counts writes so callers can observe persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `value` under `key`.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self { values, writes: 0 }
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TextStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

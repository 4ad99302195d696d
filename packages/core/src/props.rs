//! Ordered, versioned stores backing component props and inline style.

use indexmap::IndexMap;

use crate::error::ComponentError;

/// A change produced by an effective store write, reported back to the tree so
/// it can run mutation propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A key was inserted or its value replaced.
    Set { key: String, value: String },
    /// A key was removed.
    Removed { key: String },
}

/// An ordered string-to-string mapping with a monotonically increasing version.
///
/// Keys are normalized (trimmed + lowercased) on every write. Setting a key to
/// its current value is a no-op: no version bump, no reported change. All bulk
/// operations route through [`PropStore::set`] / [`PropStore::remove`] so the
/// version and the reported changes stay consistent with direct writes.
#[derive(Debug, Clone, Default)]
pub struct PropStore {
    map: IndexMap<String, String>,
    version: u64,
}

impl PropStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current store version. Bumped by 1 on every effective set or delete.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(&normalize(key))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(&normalize(key)).map(String::as_str)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Set `key` to `value`. Returns the change, or `None` when the value was
    /// already current.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<Option<StoreChange>, ComponentError> {
        let key = checked_key(key)?;
        let value = value.into();

        if self.map.get(&key).is_some_and(|old| *old == value) {
            return Ok(None);
        }

        self.map.insert(key.clone(), value.clone());
        self.version += 1;
        Ok(Some(StoreChange::Set { key, value }))
    }

    /// Remove `key`. Returns the removed value and the change, or `None` when
    /// the key was absent.
    pub fn remove(&mut self, key: &str) -> Option<(String, StoreChange)> {
        let key = normalize(key);
        // shift_remove keeps the insertion order of the surviving entries
        let value = self.map.shift_remove(&key)?;
        self.version += 1;
        Some((value, StoreChange::Removed { key }))
    }

    /// Insert `key` with `default` only when absent; returns the value the key
    /// now holds plus the change, if one happened.
    pub fn set_default(
        &mut self,
        key: &str,
        default: impl Into<String>,
    ) -> Result<(String, Option<StoreChange>), ComponentError> {
        let norm = checked_key(key)?;
        if let Some(existing) = self.map.get(&norm) {
            return Ok((existing.clone(), None));
        }
        let default = default.into();
        let change = self.set(&norm, default.clone())?;
        Ok((default, change))
    }

    /// Remove and return the value under `key`, if present.
    pub fn pop(&mut self, key: &str) -> Option<(String, StoreChange)> {
        self.remove(key)
    }

    /// Remove and return the most recently inserted entry (LIFO), if any.
    pub fn pop_last(&mut self) -> Option<(String, String, StoreChange)> {
        let key = self.map.keys().next_back()?.clone();
        let (value, change) = self.remove(&key)?;
        Some((key, value, change))
    }

    /// Apply every pair through the instrumented write path, collecting the
    /// effective changes.
    pub fn extend<K, V>(
        &mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<StoreChange>, ComponentError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut changes = Vec::new();
        for (key, value) in pairs {
            if let Some(change) = self.set(key.as_ref(), value)? {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Write without reporting a change. The version still moves so string
    /// caches keyed on it regenerate. Used by the runtime to inject reserved
    /// `data-*` props without triggering mutation cascades.
    pub(crate) fn set_silent(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ComponentError> {
        let key = checked_key(key)?;
        let value = value.into();
        if self.map.get(&key).is_some_and(|old| *old == value) {
            return Ok(());
        }
        self.map.insert(key, value);
        self.version += 1;
        Ok(())
    }

    /// Snapshot of the entries, used when freezing a value into a VDOM node.
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.map.clone()
    }
}

impl PartialEq for PropStore {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<'a> IntoIterator for &'a PropStore {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

fn checked_key(key: &str) -> Result<String, ComponentError> {
    let key = normalize(key);
    if key.is_empty() {
        return Err(ComponentError::EmptyKey);
    }
    Ok(key)
}

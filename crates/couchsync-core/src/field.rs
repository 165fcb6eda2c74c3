//! Field trees: a project directory as nested named values.
//!
//! Directories become [`FieldValue::Tree`], ordinary files become
//! [`FieldValue::Text`], and files with a `.json` extension that parse become
//! [`FieldValue::Json`]. Keys are ordered so serialization is deterministic.

use std::collections::btree_map::{self, BTreeMap};

use serde_json::{Map, Value};

/// A single value in a field tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// File content read as text.
    Text(String),
    /// Parsed content of a `.json` file.
    Json(Value),
    /// A directory.
    Tree(FieldTree),
}

impl FieldValue {
    /// Borrow the text if this is a text field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested tree if this is a directory.
    pub fn as_tree(&self) -> Option<&FieldTree> {
        match self {
            FieldValue::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Mutably borrow the nested tree if this is a directory.
    pub fn as_tree_mut(&mut self) -> Option<&mut FieldTree> {
        match self {
            FieldValue::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Convert to the JSON shape stored in the document.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Json(v) => v.clone(),
            FieldValue::Tree(t) => Value::Object(t.to_json_map()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<FieldTree> for FieldValue {
    fn from(t: FieldTree) -> Self {
        FieldValue::Tree(t)
    }
}

/// An ordered mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
    entries: BTreeMap<String, FieldValue>,
}

impl FieldTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is already taken.
    ///
    /// Returns `false` and leaves the existing entry untouched on collision.
    pub fn insert_new(&mut self, name: impl Into<String>, value: FieldValue) -> bool {
        match self.entries.entry(name.into()) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Insert or replace.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.entries.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, FieldValue> {
        self.entries.iter_mut()
    }

    /// Walk a dotted path, descending through directories and parsed JSON.
    ///
    /// Stops silently at the first missing segment. Returns one
    /// `(segment, value)` pair per segment that resolved.
    pub fn resolve_prefix<'p>(&self, path: &[&'p str]) -> Vec<(&'p str, Value)> {
        let mut resolved = Vec::with_capacity(path.len());
        let Some((first, rest)) = path.split_first() else {
            return resolved;
        };
        let Some(mut current) = self.get(first).map(FieldValue::to_json) else {
            return resolved;
        };
        resolved.push((*first, current.clone()));
        for segment in rest {
            let next = match &current {
                Value::Object(map) => map.get(*segment).cloned(),
                _ => None,
            };
            match next {
                Some(v) => {
                    resolved.push((*segment, v.clone()));
                    current = v;
                }
                None => break,
            }
        }
        resolved
    }

    /// Convert to a JSON object map.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Consume into a JSON object map.
    pub fn into_json_map(self) -> Map<String, Value> {
        self.entries
            .into_iter()
            .map(|(k, v)| {
                let json = match v {
                    FieldValue::Text(s) => Value::String(s),
                    FieldValue::Json(j) => j,
                    FieldValue::Tree(t) => Value::Object(t.into_json_map()),
                };
                (k, json)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a FieldTree {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

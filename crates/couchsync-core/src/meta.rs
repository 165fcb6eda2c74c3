//! The reserved `couchapp` metadata object and the macro object store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::Digest;
use crate::manifest::Manifest;
use crate::signatures::Signatures;

/// Top-level document key holding [`AppMeta`].
pub const META_KEY: &str = "couchapp";

/// Sub-keys of [`META_KEY`] owned by the sync engine rather than the user.
pub const RESERVED_META_KEYS: [&str; 3] = ["manifest", "signatures", "objects"];

/// Digest of macro-expanded text to the original, unexpanded text.
///
/// Written only by push, for fields whose value changed during expansion.
/// Clone looks values up here to restore macro directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectStore(BTreeMap<String, String>);

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `expanded` was produced from `original`.
    pub fn record(&mut self, expanded: &str, original: &str) {
        self.0
            .insert(Digest::of(expanded.as_bytes()).to_hex(), original.to_string());
    }

    /// The original text for an expanded value, if one was recorded.
    pub fn original_of(&self, expanded: &str) -> Option<&str> {
        self.0
            .get(&Digest::of(expanded.as_bytes()).to_hex())
            .map(String::as_str)
    }

    /// Restore `value` to its pre-expansion form, or return it unchanged.
    pub fn restore<'a>(&'a self, value: &'a str) -> &'a str {
        self.original_of(value).unwrap_or(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contents of the reserved metadata key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppMeta {
    #[serde(default, skip_serializing_if = "Manifest::is_empty")]
    pub manifest: Manifest,
    #[serde(default, skip_serializing_if = "Signatures::is_empty")]
    pub signatures: Signatures,
    #[serde(default, skip_serializing_if = "ObjectStore::is_empty")]
    pub objects: ObjectStore,
    /// User metadata (`index`, `name`, ...) from `couchapp.json`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppMeta {
    /// Decode from the JSON stored under [`META_KEY`].
    ///
    /// Anything that is not an object decodes to empty metadata.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(v @ Value::Object(_)) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
                tracing::warn!("ignoring malformed {} metadata: {}", META_KEY, e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Encode back to JSON.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Remove the engine-owned sub-keys from a metadata object.
    pub fn strip_reserved(map: &mut Map<String, Value>) {
        for key in RESERVED_META_KEYS {
            map.remove(key);
        }
    }

    /// The `index` entry, if the user set one.
    pub fn index(&self) -> Option<&str> {
        self.extra.get("index").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_store_restore() {
        let mut objects = ObjectStore::new();
        objects.record("function helper(){}\n", "// !code lib/helper.js");

        let key = Digest::of(b"function helper(){}\n").to_hex();
        assert_eq!(
            serde_json::to_value(&objects).unwrap(),
            json!({ key: "// !code lib/helper.js" })
        );
        assert_eq!(objects.restore("function helper(){}\n"), "// !code lib/helper.js");
        assert_eq!(objects.restore("untouched"), "untouched");
    }

    #[test]
    fn test_app_meta_roundtrip_keeps_user_keys() {
        let raw = json!({
            "manifest": ["views/", "views/a/map.js"],
            "signatures": {"index.html": "00"},
            "objects": {},
            "index": "index.html",
            "name": "demo"
        });
        let meta = AppMeta::from_value(Some(&raw));
        assert_eq!(meta.manifest.len(), 2);
        assert_eq!(meta.signatures.get("index.html"), Some("00"));
        assert_eq!(meta.index(), Some("index.html"));

        let back = meta.to_value();
        assert_eq!(back["name"], json!("demo"));
        assert!(back.get("objects").is_none());
    }

    #[test]
    fn test_app_meta_from_non_object() {
        assert_eq!(AppMeta::from_value(Some(&json!("x"))), AppMeta::default());
        assert_eq!(AppMeta::from_value(None), AppMeta::default());
    }

    #[test]
    fn test_strip_reserved() {
        let mut map = json!({"manifest": [], "signatures": {}, "objects": {}, "index": "i"})
            .as_object()
            .cloned()
            .unwrap();
        AppMeta::strip_reserved(&mut map);
        assert_eq!(Value::Object(map), json!({"index": "i"}));
    }
}

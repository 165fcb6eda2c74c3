//! The remote design document.
//!
//! On the wire a design document is one JSON object. Keys starting with `_`
//! are reserved: `_id`, `_rev` and `_attachments` are lifted out into typed
//! fields and everything else stays in [`Document::body`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::meta::{AppMeta, META_KEY};

/// Metadata for one stored attachment.
///
/// Written back as a stub so a document update never drops attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentStub {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default = "stub_marker")]
    pub stub: bool,
}

fn stub_marker() -> bool {
    true
}

impl AttachmentStub {
    pub fn new(content_type: &str, length: u64) -> Self {
        Self {
            content_type: Some(content_type.to_string()),
            length: Some(length),
            digest: None,
            stub: true,
        }
    }
}

/// A design document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub rev: Option<String>,
    /// Every non-reserved top-level key.
    pub body: Map<String, Value>,
    pub attachments: BTreeMap<String, AttachmentStub>,
}

impl Document {
    /// A fresh document with no revision.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            body: Map::new(),
            attachments: BTreeMap::new(),
        }
    }

    /// Decode from the wire JSON.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(CoreError::InvalidDocument("document is not an object".into()));
        };

        let id = match map.remove("_id") {
            Some(Value::String(id)) => id,
            _ => return Err(CoreError::InvalidDocument("missing _id".into())),
        };
        let rev = match map.remove("_rev") {
            Some(Value::String(rev)) => Some(rev),
            _ => None,
        };
        let attachments = match map.remove("_attachments") {
            Some(v) => serde_json::from_value(v)?,
            None => BTreeMap::new(),
        };
        map.retain(|k, _| !k.starts_with('_'));

        Ok(Self {
            id,
            rev,
            body: map,
            attachments,
        })
    }

    /// Encode to the wire JSON, attachments as stubs.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("_id".into(), Value::String(self.id.clone()));
        if let Some(rev) = &self.rev {
            map.insert("_rev".into(), Value::String(rev.clone()));
        }
        for (k, v) in &self.body {
            map.insert(k.clone(), v.clone());
        }
        if !self.attachments.is_empty() {
            let stubs = self
                .attachments
                .iter()
                .map(|(name, stub)| {
                    let stub = AttachmentStub {
                        stub: true,
                        ..stub.clone()
                    };
                    (name.clone(), serde_json::to_value(stub).unwrap_or(Value::Null))
                })
                .collect();
            map.insert("_attachments".into(), Value::Object(stubs));
        }
        Value::Object(map)
    }

    /// The reserved metadata object.
    pub fn meta(&self) -> AppMeta {
        AppMeta::from_value(self.body.get(META_KEY))
    }

    /// Replace the reserved metadata object.
    pub fn set_meta(&mut self, meta: &AppMeta) {
        self.body.insert(META_KEY.into(), meta.to_value());
    }
}

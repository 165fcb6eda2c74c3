//! In-memory implementation of the DocumentStore trait.
//!
//! This is primarily for testing. It follows CouchDB's update rules
//! (revision checks, attachments dropped when a put omits their stub) but
//! keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use bytes::Bytes;
use couchsync_core::{AttachmentStub, Digest, Document};

use crate::error::{Result, StoreError};
use crate::traits::DocumentStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    name: String,
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    docs: HashMap<String, StoredDoc>,
    /// Number of upcoming attachment uploads that fail with `Transient`.
    fail_uploads: usize,
    /// Successful attachment uploads, for assertions.
    uploads: Vec<String>,
    /// Successful attachment deletions, for assertions.
    deletions: Vec<String>,
}

struct StoredDoc {
    doc: Document,
    generation: u64,
    attachments: BTreeMap<String, StoredAttachment>,
}

struct StoredAttachment {
    content: Bytes,
    content_type: String,
}

impl StoredDoc {
    fn snapshot(&self) -> Document {
        let mut doc = self.doc.clone();
        doc.attachments = self
            .attachments
            .iter()
            .map(|(name, a)| {
                let mut stub = AttachmentStub::new(&a.content_type, a.content.len() as u64);
                stub.digest = Some(Digest::of(&a.content).to_hex());
                (name.clone(), stub)
            })
            .collect();
        doc
    }

    fn bump(&mut self) -> String {
        self.generation += 1;
        let body = serde_json::Value::Object(self.doc.body.clone()).to_string();
        let rev = format!(
            "{}-{}",
            self.generation,
            &Digest::of(body.as_bytes()).to_hex()[..16]
        );
        self.doc.rev = Some(rev.clone());
        rev
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create an empty store reported under `name` in logs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Make the next `n` attachment uploads fail with a transient error.
    pub fn fail_next_uploads(&self, n: usize) {
        self.inner.write().unwrap().fail_uploads = n;
    }

    /// Names of all attachments uploaded so far, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.inner.read().unwrap().uploads.clone()
    }

    /// Names of all attachments deleted so far, in order.
    pub fn deletions(&self) -> Vec<String> {
        self.inner.read().unwrap().deletions.clone()
    }

    /// Forget recorded uploads and deletions.
    pub fn clear_history(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.uploads.clear();
        inner.deletions.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_rev(id: &str, expected: Option<&str>, given: Option<&str>) -> Result<()> {
    if expected == given {
        Ok(())
    } else {
        Err(StoreError::Conflict(id.to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn location(&self) -> String {
        format!("memory://{}", self.name)
    }

    fn ensure_database(&self) -> Result<()> {
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.docs.get(id).map(StoredDoc::snapshot))
    }

    fn put(&self, doc: &Document) -> Result<String> {
        let mut inner = self.inner.write().unwrap();

        match inner.docs.get_mut(&doc.id) {
            Some(stored) => {
                check_rev(&doc.id, stored.doc.rev.as_deref(), doc.rev.as_deref())?;
                // attachments without a stub in the update are dropped
                stored
                    .attachments
                    .retain(|name, _| doc.attachments.contains_key(name));
                stored.doc.body = doc.body.clone();
                Ok(stored.bump())
            }
            None => {
                check_rev(&doc.id, None, doc.rev.as_deref())?;
                let mut stored = StoredDoc {
                    doc: Document {
                        attachments: BTreeMap::new(),
                        ..doc.clone()
                    },
                    generation: 0,
                    attachments: BTreeMap::new(),
                };
                let rev = stored.bump();
                inner.docs.insert(doc.id.clone(), stored);
                Ok(rev)
            }
        }
    }

    fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        let inner = self.inner.read().unwrap();
        inner
            .docs
            .get(id)
            .and_then(|d| d.attachments.get(name))
            .map(|a| a.content.clone())
            .ok_or_else(|| StoreError::NotFound(format!("{id}/{name}")))
    }

    fn put_attachment(
        &self,
        id: &str,
        rev: Option<&str>,
        name: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<String> {
        let mut inner = self.inner.write().unwrap();

        if inner.fail_uploads > 0 {
            inner.fail_uploads -= 1;
            return Err(StoreError::Transient(format!("injected failure uploading {name}")));
        }

        let current = inner.docs.get(id).and_then(|d| d.doc.rev.clone());
        check_rev(id, current.as_deref(), rev)?;

        let stored = inner.docs.entry(id.to_string()).or_insert_with(|| StoredDoc {
            doc: Document::new(id),
            generation: 0,
            attachments: BTreeMap::new(),
        });
        stored.attachments.insert(
            name.to_string(),
            StoredAttachment {
                content,
                content_type: content_type.to_string(),
            },
        );
        let new_rev = stored.bump();
        inner.uploads.push(name.to_string());
        Ok(new_rev)
    }

    fn delete_attachment(&self, id: &str, rev: &str, name: &str) -> Result<String> {
        let mut inner = self.inner.write().unwrap();

        let stored = inner
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_rev(id, stored.doc.rev.as_deref(), Some(rev))?;
        if stored.attachments.remove(name).is_none() {
            return Err(StoreError::NotFound(format!("{id}/{name}")));
        }
        let new_rev = stored.bump();
        inner.deletions.push(name.to_string());
        Ok(new_rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn design(id: &str) -> Document {
        let mut doc = Document::new(id);
        doc.body.insert("language".into(), json!("javascript"));
        doc
    }

    #[test]
    fn test_memory_store_put_get() {
        let store = MemoryStore::new();
        assert!(store.get("_design/app").unwrap().is_none());

        let rev = store.put(&design("_design/app")).unwrap();
        assert!(rev.starts_with("1-"));

        let fetched = store.get("_design/app").unwrap().unwrap();
        assert_eq!(fetched.rev.as_deref(), Some(rev.as_str()));
        assert_eq!(fetched.body["language"], json!("javascript"));
    }

    #[test]
    fn test_memory_store_rejects_stale_rev() {
        let store = MemoryStore::new();
        store.put(&design("_design/app")).unwrap();

        // no rev on an existing document
        let err = store.put(&design("_design/app")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let mut current = store.get("_design/app").unwrap().unwrap();
        current.body.insert("x".into(), json!(1));
        assert!(store.put(&current).unwrap().starts_with("2-"));
    }

    #[test]
    fn test_memory_store_attachments() {
        let store = MemoryStore::new();
        let rev = store.put(&design("_design/app")).unwrap();
        let rev = store
            .put_attachment("_design/app", Some(&rev), "a.txt", Bytes::from_static(b"abc"), "text/plain")
            .unwrap();

        let doc = store.get("_design/app").unwrap().unwrap();
        assert_eq!(doc.attachments["a.txt"].length, Some(3));
        assert_eq!(store.get_attachment("_design/app", "a.txt").unwrap(), Bytes::from_static(b"abc"));

        store.delete_attachment("_design/app", &rev, "a.txt").unwrap();
        assert!(store.get_attachment("_design/app", "a.txt").is_err());
        assert_eq!(store.uploads(), vec!["a.txt"]);
        assert_eq!(store.deletions(), vec!["a.txt"]);
    }

    #[test]
    fn test_memory_store_put_without_stub_drops_attachment() {
        let store = MemoryStore::new();
        let rev = store.put(&design("_design/app")).unwrap();
        store
            .put_attachment("_design/app", Some(&rev), "a.txt", Bytes::from_static(b"abc"), "text/plain")
            .unwrap();

        let mut doc = store.get("_design/app").unwrap().unwrap();
        store.put(&doc).unwrap();
        assert!(store.get_attachment("_design/app", "a.txt").is_ok());

        doc = store.get("_design/app").unwrap().unwrap();
        doc.attachments.clear();
        store.put(&doc).unwrap();
        assert!(store.get_attachment("_design/app", "a.txt").is_err());
    }

    #[test]
    fn test_memory_store_injected_failures() {
        let store = MemoryStore::new();
        store.fail_next_uploads(1);

        let err = store
            .put_attachment("_design/app", None, "a.txt", Bytes::from_static(b"x"), "text/plain")
            .unwrap_err();
        assert!(err.is_transient());

        store
            .put_attachment("_design/app", None, "a.txt", Bytes::from_static(b"x"), "text/plain")
            .unwrap();
    }
}

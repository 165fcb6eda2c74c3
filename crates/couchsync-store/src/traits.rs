//! DocumentStore trait: the abstract interface to the remote database.
//!
//! The sync engine never builds connections or handles authentication. It
//! receives a ready handle implementing this trait. Implementations include
//! CouchDB over HTTP and an in-memory store for tests.

use bytes::Bytes;
use couchsync_core::Document;

use crate::error::Result;

/// Blocking access to one database.
///
/// Every call completes before returning. Document updates are conditional
/// on `Document::rev`; attachment writes are conditional on the `rev`
/// argument and return the document's new revision.
pub trait DocumentStore {
    /// Human-readable location of the database, used in logs.
    fn location(&self) -> String;

    /// Create the database if it does not exist yet.
    fn ensure_database(&self) -> Result<()>;

    /// Fetch a document, `None` if it does not exist.
    fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Create or update a document. Returns the new revision.
    fn put(&self, doc: &Document) -> Result<String>;

    /// Fetch one attachment's bytes.
    fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes>;

    /// Store one attachment. Returns the document's new revision.
    fn put_attachment(
        &self,
        id: &str,
        rev: Option<&str>,
        name: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<String>;

    /// Remove one attachment. Returns the document's new revision.
    fn delete_attachment(&self, id: &str, rev: &str, name: &str) -> Result<String>;
}

/// Extension methods built on the core calls.
pub trait DocumentStoreExt: DocumentStore {
    /// Fetch a document, failing with `NotFound` if it is absent.
    fn require(&self, id: &str) -> Result<Document> {
        self.get(id)?
            .ok_or_else(|| crate::error::StoreError::NotFound(id.to_string()))
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

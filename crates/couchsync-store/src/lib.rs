//! # couchsync Store
//!
//! Storage abstraction for couchsync. Provides a trait-based interface to the
//! remote document database with a CouchDB HTTP client and an in-memory
//! implementation.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The blocking trait the sync engine talks to
//! - [`CouchStore`] - CouchDB over HTTP
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`DocumentStoreExt`] - Convenience methods over the trait
//!
//! ## Usage
//!
//! ```rust,no_run
//! use couchsync_store::{CouchStore, DocumentStore};
//!
//! let store = CouchStore::from_url("http://127.0.0.1:5984/blog").unwrap();
//! store.ensure_database().unwrap();
//! let design = store.get("_design/blog").unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Blocking**: every call completes before it returns; there is no overlap
//!   between network calls.
//! - **Conditional writes**: updates carry the revision they were based on;
//!   a stale revision fails with `Conflict`.
//! - **Transient errors**: connection and timeout failures surface as
//!   `StoreError::Transient` so callers can retry.

pub mod couch;
pub mod error;
pub mod memory;
pub mod traits;

pub use couch::{parse_db_url, CouchStore, DbUrl, DEFAULT_SERVER_URI};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{DocumentStore, DocumentStoreExt};

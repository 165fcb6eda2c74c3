//! # couchsync
//!
//! Keep a CouchDB design document and a project directory in step.
//!
//! ## Overview
//!
//! A project directory maps one-to-one onto a design document:
//!
//! - **Directories** become nested objects, **files** become fields named
//!   after the file without its extension; `.json` files are parsed.
//! - **`_attachments/`** (and `vendor/<name>/_attachments/`) become document
//!   attachments, uploaded only when their content digest changed.
//! - **`couchapp.json`** feeds the reserved `couchapp` metadata object, which
//!   also records the manifest, attachment signatures and macro sources that
//!   make clone the inverse of push.
//! - **Macros** in functions (`// !code lib/*.js`, `// !json couchapp.name`)
//!   are expanded at push time and restored at clone time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use couchsync::{clone_app, Project, SyncConfig};
//! use couchsync::store::CouchStore;
//!
//! let store = CouchStore::from_url("http://127.0.0.1:5984/blog").unwrap();
//!
//! let project = Project::open("blog", SyncConfig::default()).unwrap();
//! let report = project.push_to(&store, "blog").unwrap();
//! println!("pushed rev {}", report.rev);
//!
//! clone_app(&store, "_design/blog", "blog-copy".as_ref()).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! - `couchsync::core` - Field trees, manifest, digests, documents
//! - `couchsync::store` - The store trait, CouchDB and in-memory stores
//! - `couchsync::sync` - Serializer, macros and attachment sync

pub mod config;
pub mod error;
pub mod project;

// Re-export component crates
pub use couchsync_core as core;
pub use couchsync_store as store;
pub use couchsync_sync as sync;

pub use config::{init, DbUrls, EnvEntry, ProjectConfig, RC_FILE};
pub use error::{AppError, Result};
pub use project::{
    app_name_of, clone_app, design_id, CloneReport, Project, PushReport, TargetReport,
};

pub use couchsync_store::{DocumentStore, MemoryStore};
pub use couchsync_sync::{SyncConfig, Warning};

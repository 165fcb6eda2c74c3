//! # couchsync Sync
//!
//! The engine behind push and clone: it maps a project directory to a design
//! document body and back, expands function macros, and keeps attachments in
//! step with their local files.
//!
//! ## Push
//!
//! 1. [`serialize_dir`] turns the directory into a [`FieldTree`] plus the
//!    [`Manifest`] of what it visited.
//! 2. [`expand_functions`] resolves `!code` / `!json` directives in the
//!    function sections, recording originals in an [`ObjectStore`].
//! 3. [`push_attachments`] syncs each attachment namespace by digest.
//!
//! ## Clone
//!
//! 1. [`reconstruct`] replays the manifest, restoring macro sources, then
//!    writes whatever the manifest did not cover.
//! 2. [`pull_attachments`] downloads attachments that differ locally.
//!
//! Recoverable per-file problems never abort; they come back as
//! [`Warning`]s in the results.
//!
//! [`FieldTree`]: couchsync_core::FieldTree
//! [`Manifest`]: couchsync_core::Manifest
//! [`ObjectStore`]: couchsync_core::ObjectStore

pub mod attachments;
pub mod config;
pub mod error;
pub mod macros;
pub mod reconstruct;
pub mod report;
pub mod tree;

pub use attachments::{
    collect_local, content_type, local_path, plan, pull_attachments, push_attachments,
    vendor_namespaces, AttachmentPlan, LocalAttachments, LocalFile,
};
pub use config::SyncConfig;
pub use error::{MacroError, Result, SyncError};
pub use macros::{expand_code, expand_functions, expand_json};
pub use reconstruct::reconstruct;
pub use report::{AttachmentReport, ReconstructReport, Warning};
pub use tree::{serialize_dir, Serialized, ATTACHMENTS_DIR, META_FILE, VENDOR_DIR};

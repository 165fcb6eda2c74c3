//! # couchsync Core
//!
//! Pure types shared by every couchsync crate: the field tree a project
//! directory serializes into, the manifest that records how it was laid out,
//! content digests, and the design document with its reserved metadata.
//!
//! This crate does no networking. The only filesystem access is
//! [`Digest::of_file`].
//!
//! ## Key Types
//!
//! - [`FieldTree`] / [`FieldValue`] - Directory contents as nested fields
//! - [`Manifest`] - Ordered record of the paths a push serialized
//! - [`Digest`] - BLAKE3 content fingerprint
//! - [`ObjectStore`] - Expanded-digest to original-source map for macro reversal
//! - [`Signatures`] - Attachment fingerprint table, scoped by [`Namespace`]
//! - [`Document`] - The remote design document
//! - [`AppMeta`] - The reserved `couchapp` metadata object

pub mod digest;
pub mod document;
pub mod error;
pub mod field;
pub mod manifest;
pub mod meta;
pub mod signatures;

pub use digest::Digest;
pub use document::{AttachmentStub, Document};
pub use error::{CoreError, Result};
pub use field::{FieldTree, FieldValue};
pub use manifest::{Manifest, ManifestEntry};
pub use meta::{AppMeta, ObjectStore, META_KEY};
pub use signatures::{Namespace, Signatures};

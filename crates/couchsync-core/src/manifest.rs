//! The manifest: an ordered list of the paths a push serialized.
//!
//! Directories are stored with a trailing `/`. Clone replays the list in
//! order to put every field back where it came from.

use serde::{Deserialize, Serialize};

/// One manifest entry, borrowed from the stored string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestEntry<'a> {
    /// A directory, without its trailing `/`.
    Dir(&'a str),
    /// A file, with its original extension.
    File(&'a str),
}

impl<'a> ManifestEntry<'a> {
    fn parse(raw: &'a str) -> Self {
        match raw.strip_suffix('/') {
            Some(dir) => ManifestEntry::Dir(dir),
            None => ManifestEntry::File(raw),
        }
    }

    /// The relative path without the directory marker.
    pub fn path(&self) -> &'a str {
        match self {
            ManifestEntry::Dir(p) | ManifestEntry::File(p) => p,
        }
    }
}

/// Ordered relative paths, appended in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<String>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory.
    pub fn push_dir(&mut self, rel_path: &str) {
        self.0.push(format!("{}/", rel_path.trim_end_matches('/')));
    }

    /// Record a file.
    pub fn push_file(&mut self, rel_path: &str) {
        self.0.push(rel_path.to_string());
    }

    pub fn entries(&self) -> impl Iterator<Item = ManifestEntry<'_>> {
        self.0.iter().map(|s| ManifestEntry::parse(s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw stored strings.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Manifest {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

//! Test fixtures and helpers.
//!
//! Scratch project directories for integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use couchsync_store::MemoryStore;
use tempfile::TempDir;

/// A scratch project directory and a memory store to push it to.
pub struct ProjectFixture {
    dir: TempDir,
    pub store: MemoryStore,
}

impl ProjectFixture {
    /// An empty project.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            store: MemoryStore::new(),
        }
    }

    /// A small app exercising every kind of entry: text fields, parsed JSON,
    /// views, shows, metadata, macros and attachments.
    pub fn blog() -> Self {
        let fixture = Self::new();
        fixture
            .write(".couchapprc", "{}")
            .write("couchapp.json", r#"{"name": "Blog", "description": "A blog"}"#)
            .write("language", "javascript")
            .write("options.json", r#"{"local_seq": true}"#)
            .write("lib/markdown.js", "function markdown(s) { return s; }\n")
            .write(
                "views/recent/map.js",
                "function(doc) {\n  // !code lib/markdown.js\n  emit(doc.date, markdown(doc.body));\n}",
            )
            .write("views/recent/reduce.js", "_count")
            .write(
                "shows/post.js",
                "function(doc, req) {\n  // !json couchapp.name\n  return couchapp.name;\n}",
            )
            .write("_attachments/index.html", "<html><body>blog</body></html>")
            .write("_attachments/css/site.css", "body { margin: 0; }")
            .write("vendor/couchapp/_attachments/jquery.couch.js", "/* couch */");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture file");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read fixture file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn remove(&self, rel: &str) -> &Self {
        let path = self.path(rel);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("remove fixture dir");
        } else {
            fs::remove_file(path).expect("remove fixture file");
        }
        self
    }

    /// Every file under the root by relative path, `.couchapprc` excluded.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.root(), "", &mut files);
        files.remove(".couchapprc");
        files
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(dir: &Path, prefix: &str, files: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read fixture dir") {
        let entry = entry.expect("read fixture entry");
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            collect(&path, &rel, files);
        } else {
            files.insert(rel, fs::read(&path).expect("read fixture file"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_fixture() {
        let blog = ProjectFixture::blog();
        assert_eq!(blog.read("language"), "javascript");
        assert!(blog.exists("_attachments/css/site.css"));

        let files = blog.files();
        assert!(!files.contains_key(".couchapprc"));
        assert!(files.contains_key("vendor/couchapp/_attachments/jquery.couch.js"));
    }
}

//! Design document back to a project directory.
//!
//! Two passes over the document body:
//! 1. Replay the manifest in order. Directory entries are created; file
//!    entries take their value out of the body and write it, after restoring
//!    any macro source recorded in the object store.
//! 2. Write every top-level key the manifest did not consume, using the
//!    shape of the value to pick a layout.

use std::fs;
use std::path::{Component, Path, PathBuf};

use couchsync_core::{AppMeta, Document, ManifestEntry, ObjectStore, META_KEY};
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::report::ReconstructReport;
use crate::tree::{strip_extension, JSON_EXT, META_FILE};

/// Extension given to functions written by the fallback pass.
pub const FUNCTION_EXT: &str = "js";

/// Sections holding one level of named functions.
const FUNCTION_SECTIONS: [&str; 2] = ["shows", "lists"];

/// Section holding named views, each a set of functions.
const VIEWS_SECTION: &str = "views";

/// Materialize `doc` under `root`.
pub fn reconstruct(doc: &Document, root: &Path) -> Result<ReconstructReport> {
    let meta = doc.meta();
    let mut body = doc.body.clone();
    let mut report = ReconstructReport::default();

    for entry in meta.manifest.entries() {
        tracing::debug!("clone property: {}", entry.path());
        match entry {
            ManifestEntry::Dir(rel) => {
                let Some(dir) = contained(root, rel) else {
                    continue;
                };
                fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;
            }
            ManifestEntry::File(rel) if rel == META_FILE => {}
            ManifestEntry::File(rel) => {
                let parts: Vec<&str> = rel.split('/').collect();
                let Some((file_name, parents)) = parts.split_last() else {
                    continue;
                };
                let Some(value) = take_leaf(&mut body, parents, strip_extension(file_name)) else {
                    tracing::debug!("{} listed in manifest but not in document", rel);
                    continue;
                };
                prune_empty(&mut body, parents);
                let Some(path) = contained(root, rel) else {
                    continue;
                };
                write_file(&path, &render(&value, file_name.ends_with(JSON_EXT), &meta.objects)?)?;
                report.from_manifest.push(path);
            }
        }
    }

    // directories are consumed by being created
    let dirs: Vec<&str> = meta
        .manifest
        .entries()
        .filter_map(|entry| match entry {
            ManifestEntry::Dir(rel) => Some(rel),
            ManifestEntry::File(_) => None,
        })
        .collect();
    for rel in dirs.iter().rev() {
        let parts: Vec<&str> = rel.split('/').collect();
        remove_empty(&mut body, &parts);
    }

    for (key, value) in &body {
        if key.starts_with('_') || contained(root, key).is_none() {
            continue;
        }
        tracing::debug!("clone property not in manifest: {}", key);
        let written = if key == META_KEY {
            write_meta(root, value)?
        } else if key == VIEWS_SECTION && is_object_of_objects(value) {
            write_views(root, value, &meta.objects)?
        } else if FUNCTION_SECTIONS.contains(&key.as_str()) && value.is_object() {
            write_functions(&root.join(key), value, &meta.objects)?
        } else {
            write_fallback(root, key, value, &meta.objects)?
        };
        report.from_fallback.extend(written);
    }

    Ok(report)
}

/// Remove and return `parents/.../key` from `body`.
fn take_leaf(body: &mut Map<String, Value>, parents: &[&str], key: &str) -> Option<Value> {
    let mut current = body;
    for part in parents {
        current = current.get_mut(*part)?.as_object_mut()?;
    }
    current.remove(key)
}

/// Drop mappings along `parents` that became empty.
fn prune_empty(body: &mut Map<String, Value>, parents: &[&str]) {
    let Some((first, rest)) = parents.split_first() else {
        return;
    };
    if let Some(Value::Object(child)) = body.get_mut(*first) {
        prune_empty(child, rest);
        if child.is_empty() {
            body.remove(*first);
        }
    }
}

/// `root/rel`, or `None` (with a warning) if `rel` could leave `root`.
fn contained(root: &Path, rel: &str) -> Option<PathBuf> {
    let path = Path::new(rel);
    let normal = !rel.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if !normal {
        tracing::warn!("skipping unsafe path {:?} under {}", rel, root.display());
        return None;
    }
    Some(root.join(path))
}

/// Remove the mapping at `path` if it is empty.
fn remove_empty(body: &mut Map<String, Value>, path: &[&str]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = body;
    for part in parents {
        match current.get_mut(*part).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
    if current
        .get(*last)
        .and_then(Value::as_object)
        .is_some_and(Map::is_empty)
    {
        current.remove(*last);
    }
}

/// File content for a value: text as-is (restored through the object store),
/// anything else or any `.json` file as JSON.
fn render(value: &Value, as_json: bool, objects: &ObjectStore) -> Result<Vec<u8>> {
    let value = match value {
        Value::String(s) => Value::String(objects.restore(s).to_string()),
        other => other.clone(),
    };
    match value {
        Value::String(s) if !as_json => Ok(s.into_bytes()),
        other => Ok(serde_json::to_vec_pretty(&other)?),
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| SyncError::io(path, e))
}

fn is_object_of_objects(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.values().all(Value::is_object))
}

/// `couchapp.json` with the engine-owned keys removed.
fn write_meta(root: &Path, value: &Value) -> Result<Vec<PathBuf>> {
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };
    let mut user = map.clone();
    AppMeta::strip_reserved(&mut user);
    if user.is_empty() {
        return Ok(Vec::new());
    }
    let path = root.join(META_FILE);
    write_file(&path, &serde_json::to_vec_pretty(&Value::Object(user))?)?;
    Ok(vec![path])
}

/// `views/<view>/<function>.js`
fn write_views(root: &Path, views: &Value, objects: &ObjectStore) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let Value::Object(views) = views {
        for (view, functions) in views {
            let Some(dir) = contained(&root.join(VIEWS_SECTION), view) else {
                continue;
            };
            written.extend(write_functions(&dir, functions, objects)?);
        }
    }
    Ok(written)
}

/// `<dir>/<function>.js`
fn write_functions(dir: &Path, functions: &Value, objects: &ObjectStore) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
    if let Value::Object(functions) = functions {
        for (name, source) in functions {
            let Some(path) = contained(dir, &format!("{name}.{FUNCTION_EXT}")) else {
                continue;
            };
            write_file(&path, &render(source, false, objects)?)?;
            written.push(path);
        }
    }
    Ok(written)
}

/// Generic layout for keys with no known role.
fn write_fallback(
    root: &Path,
    key: &str,
    value: &Value,
    objects: &ObjectStore,
) -> Result<Vec<PathBuf>> {
    match value {
        Value::Array(_) => {
            let path = root.join(format!("{key}{JSON_EXT}"));
            write_file(&path, &serde_json::to_vec_pretty(value)?)?;
            Ok(vec![path])
        }
        Value::Object(fields) => {
            let dir = root.join(key);
            fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;
            let mut written = Vec::new();
            for (field, inner) in fields {
                let file_name = match inner {
                    Value::String(_) => field.clone(),
                    _ => format!("{field}{JSON_EXT}"),
                };
                let Some(path) = contained(&dir, &file_name) else {
                    continue;
                };
                write_file(&path, &render(inner, !inner.is_string(), objects)?)?;
                written.push(path);
            }
            Ok(written)
        }
        _ => {
            let path = root.join(key);
            write_file(&path, &render(value, false, objects)?)?;
            Ok(vec![path])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchsync_core::{AppMeta, Manifest};
    use serde_json::json;

    fn doc_with(body: Value, manifest: &[&str], objects: ObjectStore) -> Document {
        let mut doc = Document::new("_design/app");
        doc.body = body.as_object().cloned().unwrap();
        let meta = AppMeta {
            manifest: Manifest::from(manifest.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
            objects,
            ..doc.meta()
        };
        doc.set_meta(&meta);
        doc
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    #[test]
    fn test_manifest_replay_writes_files() {
        let doc = doc_with(
            json!({
                "language": "javascript",
                "options": {"local_seq": true},
                "views": {"byName": {"map": "function(doc){}"}}
            }),
            &["language", "options.json", "views/", "views/byName/", "views/byName/map.js"],
            ObjectStore::new(),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = reconstruct(&doc, dir.path()).unwrap();

        assert_eq!(read(dir.path(), "language"), "javascript");
        assert_eq!(read(dir.path(), "views/byName/map.js"), "function(doc){}");
        let options: Value = serde_json::from_str(&read(dir.path(), "options.json")).unwrap();
        assert_eq!(options, json!({"local_seq": true}));
        assert_eq!(report.from_manifest.len(), 3);
        assert!(report.from_fallback.is_empty());
    }

    #[test]
    fn test_object_store_restores_macro_source() {
        let mut objects = ObjectStore::new();
        objects.record("function helper(){}\n", "// !code lib/helper.js");
        let doc = doc_with(
            json!({"views": {"byName": {"map": "function helper(){}\n"}}}),
            &["views/", "views/byName/", "views/byName/map.js"],
            objects,
        );
        let dir = tempfile::tempdir().unwrap();

        reconstruct(&doc, dir.path()).unwrap();
        assert_eq!(read(dir.path(), "views/byName/map.js"), "// !code lib/helper.js");
    }

    #[test]
    fn test_fallback_layouts() {
        let doc = doc_with(
            json!({
                "couchapp": {"name": "demo"},
                "shows": {"post": "function(doc, req){}"},
                "views": {"recent": {"map": "m", "reduce": "_count"}},
                "rewrites": [{"from": "/", "to": "index.html"}],
                "lib": {"util": "var x;", "conf": {"a": 1}},
                "version": 3
            }),
            &[],
            ObjectStore::new(),
        );
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let report = reconstruct(&doc, root).unwrap();

        let meta: Value = serde_json::from_str(&read(root, "couchapp.json")).unwrap();
        assert_eq!(meta, json!({"name": "demo"}));
        assert_eq!(read(root, "shows/post.js"), "function(doc, req){}");
        assert_eq!(read(root, "views/recent/map.js"), "m");
        assert_eq!(read(root, "views/recent/reduce.js"), "_count");
        let rewrites: Value = serde_json::from_str(&read(root, "rewrites.json")).unwrap();
        assert_eq!(rewrites, json!([{"from": "/", "to": "index.html"}]));
        assert_eq!(read(root, "lib/util"), "var x;");
        let conf: Value = serde_json::from_str(&read(root, "lib/conf.json")).unwrap();
        assert_eq!(conf, json!({"a": 1}));
        assert_eq!(read(root, "version"), "3");
        assert_eq!(report.from_fallback.len(), 8);
    }

    #[test]
    fn test_consumed_keys_are_not_rewritten() {
        let doc = doc_with(
            json!({"lib": {"util": "var x;"}, "extra": "kept"}),
            &["lib/", "lib/util.js"],
            ObjectStore::new(),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = reconstruct(&doc, dir.path()).unwrap();
        assert_eq!(read(dir.path(), "lib/util.js"), "var x;");
        assert!(!dir.path().join("lib/util").exists());
        assert_eq!(report.from_fallback, vec![dir.path().join("extra")]);
    }

    #[test]
    fn test_empty_directories_are_not_rewritten() {
        let doc = doc_with(
            json!({"vendor": {"couchapp": {}}, "lib": {}}),
            &["lib/", "vendor/", "vendor/couchapp/"],
            ObjectStore::new(),
        );
        let dir = tempfile::tempdir().unwrap();

        let report = reconstruct(&doc, dir.path()).unwrap();
        assert!(report.from_fallback.is_empty());
        assert!(dir.path().join("vendor/couchapp").is_dir());
        assert!(!dir.path().join("vendor/couchapp.json").exists());
    }

    #[test]
    fn test_paths_outside_root_are_skipped() {
        let doc = doc_with(
            json!({
                "..": {"escaped": "pwned"},
                "views": {"..": {"map": "x"}},
                "lists": {"../../up": "y"},
                "ok": "fine"
            }),
            &["../escaped.txt", "../outside/"],
            ObjectStore::new(),
        );
        let outer = tempfile::tempdir().unwrap();
        let dest = outer.path().join("dest");
        fs::create_dir_all(&dest).unwrap();

        let report = reconstruct(&doc, &dest).unwrap();
        assert!(report.from_manifest.is_empty());
        assert_eq!(report.from_fallback, vec![dest.join("ok")]);
        assert!(!outer.path().join("escaped.txt").exists());
        assert!(!outer.path().join("escaped").exists());
        assert!(!outer.path().join("outside").exists());
        assert!(!dest.join("map.js").exists());
        assert!(!outer.path().join("up.js").exists());
    }

    #[test]
    fn test_missing_manifest_entry_is_skipped() {
        let doc = doc_with(json!({}), &["gone.js", "lib/"], ObjectStore::new());
        let dir = tempfile::tempdir().unwrap();

        let report = reconstruct(&doc, dir.path()).unwrap();
        assert!(report.from_manifest.is_empty());
        assert!(dir.path().join("lib").is_dir());
    }
}

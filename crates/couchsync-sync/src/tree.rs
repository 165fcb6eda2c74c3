//! Project directory to field tree.
//!
//! Walks a project directory and builds the [`FieldTree`] pushed as the
//! design document body, recording every visited path in a [`Manifest`].
//!
//! Rules:
//! 1. Names starting with `.` or `_` are never content and are skipped.
//! 2. At the root, `couchapp.json` and `couchapp/` feed the reserved
//!    metadata field instead of an ordinary field.
//! 3. Directories become nested trees; files become fields keyed by their
//!    name without extension. `.json` files are parsed.
//! 4. Entries are visited in lexicographic order and the first entry to
//!    claim a field name wins; later ones are dropped with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use couchsync_core::{AppMeta, FieldTree, FieldValue, Manifest, META_KEY};
use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::report::Warning;

/// Root-level file holding user metadata.
pub const META_FILE: &str = "couchapp.json";

/// Directory of the project's own attachments.
pub const ATTACHMENTS_DIR: &str = "_attachments";

/// Directory holding vendor packages.
pub const VENDOR_DIR: &str = "vendor";

/// Extension marking files whose content is parsed as JSON.
pub const JSON_EXT: &str = ".json";

/// Result of serializing a project directory.
#[derive(Debug, Clone, Default)]
pub struct Serialized {
    pub fields: FieldTree,
    pub manifest: Manifest,
    pub warnings: Vec<Warning>,
}

/// Serialize the project at `root`.
pub fn serialize_dir(root: &Path) -> Result<Serialized> {
    let mut manifest = Manifest::new();
    let mut warnings = Vec::new();
    let fields = Walker {
        manifest: &mut manifest,
        warnings: &mut warnings,
    }
    .visit(root, "")?;

    Ok(Serialized {
        fields,
        manifest,
        warnings,
    })
}

/// Strip the last extension: `map.js` -> `map`, `a.b.json` -> `a.b`.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// Directory entries sorted by name. Names that are not UTF-8 are skipped
/// and reported in `warnings`.
pub(crate) fn sorted_entries(
    dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<(String, PathBuf, bool)>> {
    let read = fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))?;
    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warnings.push(Warning::UndecodableName { path }.emit());
            continue;
        };
        let is_dir = path.is_dir();
        entries.push((name, path, is_dir));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Recursive visitor. Manifest and warnings are threaded explicitly.
struct Walker<'a> {
    manifest: &'a mut Manifest,
    warnings: &'a mut Vec<Warning>,
}

impl Walker<'_> {
    fn visit(&mut self, dir: &Path, prefix: &str) -> Result<FieldTree> {
        let mut fields = FieldTree::new();

        for (name, path, is_dir) in sorted_entries(dir, self.warnings)? {
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            let rel = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };

            if prefix.is_empty() && (name == META_KEY || name == META_FILE) {
                let content = self.read_meta(&path, &rel, is_dir)?;
                merge_meta(&mut fields, content);
            } else if is_dir {
                if fields.contains(&name) {
                    self.collision(path, &name);
                    continue;
                }
                self.manifest.push_dir(&rel);
                let nested = self.visit(&path, &rel)?;
                fields.insert(name, FieldValue::Tree(nested));
            } else {
                let key = strip_extension(&name);
                if fields.contains(key) {
                    self.collision(path, key);
                    continue;
                }
                tracing::debug!("push {}", rel);
                let value = self.read_field(&path, &name)?;
                self.manifest.push_file(&rel);
                fields.insert(key, value);
            }
        }

        Ok(fields)
    }

    /// Read an ordinary file as a field value.
    fn read_field(&mut self, path: &Path, name: &str) -> Result<FieldValue> {
        let bytes = fs::read(path).map_err(|e| SyncError::io(path, e))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                self.warnings.push(
                    Warning::Decode {
                        path: path.to_path_buf(),
                    }
                    .emit(),
                );
                return Ok(FieldValue::Text(String::new()));
            }
        };

        if !name.ends_with(JSON_EXT) {
            return Ok(FieldValue::Text(text));
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(FieldValue::Json(value)),
            Err(e) => {
                self.warnings.push(
                    Warning::Parse {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                    .emit(),
                );
                Ok(FieldValue::Text(text))
            }
        }
    }

    /// Read `couchapp.json` or `couchapp/` into a metadata object.
    fn read_meta(&mut self, path: &Path, rel: &str, is_dir: bool) -> Result<Map<String, Value>> {
        let mut content = if is_dir {
            self.manifest.push_dir(rel);
            self.visit(path, rel)?.into_json_map()
        } else {
            self.manifest.push_file(rel);
            match self.read_field(path, META_FILE)? {
                FieldValue::Json(Value::Object(map)) => map,
                FieldValue::Json(other) => {
                    let mut wrapped = Map::new();
                    wrapped.insert("meta".into(), other);
                    wrapped
                }
                // unparseable metadata was already reported
                _ => Map::new(),
            }
        };
        AppMeta::strip_reserved(&mut content);
        Ok(content)
    }

    fn collision(&mut self, path: PathBuf, field: &str) {
        self.warnings.push(
            Warning::NameCollision {
                path,
                field: field.to_string(),
            }
            .emit(),
        );
    }
}

/// Merge metadata into the reserved field, later sources overriding keys.
fn merge_meta(fields: &mut FieldTree, content: Map<String, Value>) {
    match fields.get_mut(META_KEY) {
        Some(FieldValue::Json(Value::Object(existing))) => existing.extend(content),
        _ => {
            fields.insert(META_KEY, FieldValue::Json(Value::Object(content)));
        }
    }
}

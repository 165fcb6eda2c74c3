//! `!code` and `!json` macros in design document functions.
//!
//! A directive is a comment marker (`//` or `#`) followed by `!code <glob>`
//! or `!json <path>`, running to the end of the line.
//!
//! - `!code` is replaced by the concatenated contents of every file the glob
//!   matches under the project root. No match aborts the push.
//! - `!json` collects values, either files under `_attachments` or a dotted
//!   path into the document, and every `!json` line is replaced by one
//!   `var <name> = <json>;` line per collected top-level name.
//!
//! Expansion is recorded in the [`ObjectStore`] so clone can put the
//! directives back.

use std::fs;
use std::path::{Path, PathBuf};

use couchsync_core::{FieldTree, FieldValue, ObjectStore};
use once_cell::sync::Lazy;
use regex_lite::{NoExpand, Regex};
use serde_json::{Map, Value};

use crate::error::{MacroError, Result};
use crate::report::Warning;
use crate::tree::{ATTACHMENTS_DIR, JSON_EXT};

static CODE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(//|#) ?!code (.*)").expect("valid code directive regex"));

static JSON_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(//|#) ?!json (.*)").expect("valid json directive regex"));

/// Top-level sections whose text leaves are functions.
pub const FUNCTION_SECTIONS: [&str; 4] = ["shows", "lists", "validate_doc_update", "views"];

/// Expand macros in every function of `fields`, recording changed values in
/// `objects`.
///
/// Dotted `!json` paths resolve against `fields` as it was before this call.
pub fn expand_functions(
    fields: &mut FieldTree,
    root: &Path,
    objects: &mut ObjectStore,
) -> Result<Vec<Warning>> {
    let snapshot = fields.clone();
    let mut expander = Expander {
        root,
        snapshot: &snapshot,
        objects,
        warnings: Vec::new(),
    };
    for section in FUNCTION_SECTIONS {
        if let Some(value) = fields.get_mut(section) {
            expander.expand_value(value, section)?;
        }
    }
    Ok(expander.warnings)
}

struct Expander<'a> {
    root: &'a Path,
    snapshot: &'a FieldTree,
    objects: &'a mut ObjectStore,
    warnings: Vec<Warning>,
}

impl Expander<'_> {
    fn expand_value(&mut self, value: &mut FieldValue, function: &str) -> Result<()> {
        match value {
            FieldValue::Text(source) => {
                let code = expand_code(source, self.root, function)?;
                let expanded =
                    expand_json(&code, self.root, self.snapshot, function, &mut self.warnings)?;
                if expanded != *source {
                    tracing::debug!("expanded macros in {}", function);
                    self.objects.record(&expanded, source);
                    *source = expanded;
                }
            }
            FieldValue::Tree(tree) => {
                for (name, child) in tree.iter_mut() {
                    self.expand_value(child, &format!("{function}.{name}"))?;
                }
            }
            FieldValue::Json(_) => {}
        }
        Ok(())
    }
}

/// Replace each `!code` directive in `text` with the files it names.
pub fn expand_code(
    text: &str,
    root: &Path,
    function: &str,
) -> std::result::Result<String, MacroError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in CODE_DIRECTIVE.captures_iter(text) {
        let Some(directive) = caps.get(0) else {
            continue;
        };
        let pattern = caps.get(2).map_or("", |m| m.as_str());
        out.push_str(&text[last..directive.start()]);
        for path in glob_files(root, pattern, function)? {
            out.push_str(&read_text(&path)?);
        }
        last = directive.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Replace every `!json` directive in `text` with the collected variables.
///
/// Text is returned unchanged when it has no directive or none of its paths
/// resolve.
pub fn expand_json(
    text: &str,
    root: &Path,
    doc: &FieldTree,
    function: &str,
    warnings: &mut Vec<Warning>,
) -> std::result::Result<String, MacroError> {
    if !JSON_DIRECTIVE.is_match(text) {
        return Ok(text.to_string());
    }

    let mut included = Map::new();
    for caps in JSON_DIRECTIVE.captures_iter(text) {
        let path = caps.get(2).map_or("", |m| m.as_str()).trim();
        if path.starts_with(ATTACHMENTS_DIR) {
            include_files(&mut included, root, path, function, warnings)?;
        } else {
            include_doc_path(&mut included, doc, path);
        }
    }

    if included.is_empty() {
        return Ok(text.to_string());
    }

    let block = included
        .iter()
        .map(|(name, value)| format!("var {name} = {value};"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(JSON_DIRECTIVE.replace_all(text, NoExpand(&block)).into_owned())
}

/// Files matching `pattern` under `root`, in sorted order.
fn glob_files(
    root: &Path,
    pattern: &str,
    function: &str,
) -> std::result::Result<Vec<PathBuf>, MacroError> {
    let pattern = pattern.trim();
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let entries = glob::glob(&full).map_err(|e| MacroError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            MacroError::Read {
                path,
                source: e.into_error(),
            }
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(MacroError::GlobNoMatch {
            pattern: pattern.to_string(),
            function: function.to_string(),
        });
    }
    Ok(files)
}

fn read_text(path: &Path) -> std::result::Result<String, MacroError> {
    fs::read_to_string(path).map_err(|source| MacroError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Include attachment files, nested by their path under the project root.
fn include_files(
    included: &mut Map<String, Value>,
    root: &Path,
    pattern: &str,
    function: &str,
    warnings: &mut Vec<Warning>,
) -> std::result::Result<(), MacroError> {
    for path in glob_files(root, pattern, function)? {
        let text = read_text(&path)?;
        let mut value = if path.to_string_lossy().ends_with(JSON_EXT) {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                warnings.push(
                    Warning::Parse {
                        path: path.clone(),
                        reason: e.to_string(),
                    }
                    .emit(),
                );
                Value::String(text.clone())
            })
        } else {
            Value::String(text)
        };

        let rel = path.strip_prefix(root).unwrap_or(path.as_path());
        let mut names: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some(top) = names.first().cloned() else {
            continue;
        };
        while names.len() > 1 {
            if let Some(name) = names.pop() {
                let mut wrapper = Map::new();
                wrapper.insert(name, value);
                value = Value::Object(wrapper);
            }
        }
        merge(included, top, value);
    }
    Ok(())
}

/// Include the value at a dotted path, stopping at the first missing segment.
fn include_doc_path(included: &mut Map<String, Value>, doc: &FieldTree, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut resolved = doc.resolve_prefix(&segments);
    let complete = resolved.len() == segments.len();

    let Some((last_segment, last_value)) = resolved.pop() else {
        return;
    };
    let mut name = last_segment.to_string();
    let mut value = if complete {
        last_value
    } else {
        Value::Object(Map::new())
    };
    while let Some((segment, _)) = resolved.pop() {
        let mut wrapper = Map::new();
        wrapper.insert(name, value);
        value = Value::Object(wrapper);
        name = segment.to_string();
    }
    merge(included, name, value);
}

/// Insert `value` under `key`, merging objects recursively.
fn merge(target: &mut Map<String, Value>, key: String, value: Value) {
    if let Value::Object(incoming) = value {
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            for (k, v) in incoming {
                merge(existing, k, v);
            }
            return;
        }
        target.insert(key, Value::Object(incoming));
    } else {
        target.insert(key, value);
    }
}

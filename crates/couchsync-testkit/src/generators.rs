//! Proptest generators for project trees.
//!
//! Generated trees never produce name collisions, hidden or reserved names,
//! or macro directives, so push followed by clone must reproduce them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use proptest::prelude::*;
use serde_json::Value;

/// One entry of a generated project.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A file; `ext` is empty for files without an extension.
    File { ext: &'static str, content: String },
    Dir(BTreeMap<String, Node>),
}

/// A file or directory stem. Cannot start with `.`/`_` or spell a reserved
/// or function section name.
pub fn stem() -> impl Strategy<Value = String> {
    "[a-b][a-z0-9]{0,5}".prop_map(String::from)
}

/// Text that is valid UTF-8 and holds no directives.
pub fn text() -> impl Strategy<Value = String> {
    "[a-z0-9 ;(){}=\n]{0,40}".prop_map(String::from)
}

/// A JSON value as stored in a `.json` file.
pub fn json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..4).prop_map(Value::from),
        prop::collection::btree_map("[a-z]{1,4}", any::<i16>(), 0..4)
            .prop_map(|m| Value::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect())),
    ]
}

/// A single file.
pub fn file_node() -> impl Strategy<Value = Node> {
    prop_oneof![
        (text(), prop::sample::select(vec!["js", "txt", "html", ""]))
            .prop_map(|(content, ext)| Node::File { ext, content }),
        json_value().prop_map(|value| Node::File {
            ext: "json",
            content: value.to_string(),
        }),
    ]
}

/// A whole project: up to three levels of directories.
pub fn project_tree() -> impl Strategy<Value = BTreeMap<String, Node>> {
    let node = file_node().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map(stem(), inner, 0..4).prop_map(Node::Dir)
    });
    prop::collection::btree_map(stem(), node, 1..6)
}

/// Materialize a generated tree under `root`.
pub fn write_tree(root: &Path, tree: &BTreeMap<String, Node>) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    for (stem, node) in tree {
        match node {
            Node::File { ext, content } => {
                let name = if ext.is_empty() {
                    stem.clone()
                } else {
                    format!("{stem}.{ext}")
                };
                fs::write(root.join(name), content)?;
            }
            Node::Dir(children) => write_tree(&root.join(stem), children)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_trees_write(tree in project_tree()) {
            let dir = tempfile::tempdir().unwrap();
            write_tree(dir.path(), &tree).unwrap();
            for stem in tree.keys() {
                let present = fs::read_dir(dir.path())
                    .unwrap()
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_name().to_string_lossy().starts_with(stem.as_str()));
                prop_assert!(present);
            }
        }
    }
}

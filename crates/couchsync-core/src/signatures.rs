//! Attachment fingerprint table and namespaces.
//!
//! Attachments pushed from the project's own `_attachments` directory live in
//! the primary namespace. Each vendor package contributes its attachments
//! under `vendor/<name>/`. A sync pass only ever touches entries of its own
//! namespace.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

/// Prefix shared by every vendor namespace.
pub const VENDOR_PREFIX: &str = "vendor/";

/// Which part of the attachment namespace a sync pass owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The project's own `_attachments`.
    Primary,
    /// A vendor package's `_attachments`, stored under `vendor/<name>/`.
    Vendor(String),
}

impl Namespace {
    /// Whether an attachment name belongs to this namespace.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Namespace::Primary => !name.starts_with(VENDOR_PREFIX),
            Namespace::Vendor(vendor) => name
                .strip_prefix(VENDOR_PREFIX)
                .and_then(|rest| rest.strip_prefix(vendor.as_str()))
                .is_some_and(|rest| rest.starts_with('/')),
        }
    }

    /// Turn a path relative to the namespace's directory into an attachment name.
    pub fn qualify(&self, rel: &str) -> String {
        match self {
            Namespace::Primary => rel.to_string(),
            Namespace::Vendor(vendor) => format!("{VENDOR_PREFIX}{vendor}/{rel}"),
        }
    }

    /// Split an attachment name into its namespace and the path relative to it.
    pub fn split(name: &str) -> (Namespace, &str) {
        if let Some(rest) = name.strip_prefix(VENDOR_PREFIX) {
            if let Some((vendor, rel)) = rest.split_once('/') {
                if !vendor.is_empty() && !rel.is_empty() {
                    return (Namespace::Vendor(vendor.to_string()), rel);
                }
            }
        }
        (Namespace::Primary, name)
    }
}

/// Attachment name to hex digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signatures(BTreeMap<String, String>);

impl Signatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, digest: impl Into<String>) {
        self.0.insert(name.into(), digest.into());
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of one namespace.
    pub fn in_namespace<'a>(
        &'a self,
        ns: &'a Namespace,
    ) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        self.0.iter().filter(move |(name, _)| ns.contains(name))
    }

    /// Replace every entry of `ns` with `fresh`, keeping other namespaces.
    pub fn replace_namespace(&self, ns: &Namespace, fresh: &Signatures) -> Signatures {
        let mut merged: BTreeMap<String, String> = self
            .0
            .iter()
            .filter(|(name, _)| !ns.contains(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merged.extend(fresh.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Signatures(merged)
    }
}

impl FromIterator<(String, String)> for Signatures {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Signatures(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_contains() {
        let primary = Namespace::Primary;
        let foo = Namespace::Vendor("foo".into());

        assert!(primary.contains("index.html"));
        assert!(primary.contains("style/main.css"));
        assert!(!primary.contains("vendor/foo/a.js"));

        assert!(foo.contains("vendor/foo/a.js"));
        assert!(!foo.contains("vendor/foobar/a.js"));
        assert!(!foo.contains("vendor/foo"));
        assert!(!foo.contains("index.html"));
    }

    #[test]
    fn test_qualify_and_split() {
        let foo = Namespace::Vendor("foo".into());
        let name = foo.qualify("js/app.js");
        assert_eq!(name, "vendor/foo/js/app.js");
        assert_eq!(Namespace::split(&name), (foo, "js/app.js"));
        assert_eq!(Namespace::split("index.html"), (Namespace::Primary, "index.html"));
    }

    #[test]
    fn test_replace_namespace_preserves_others() {
        let mut remote = Signatures::new();
        remote.insert("index.html", "aa");
        remote.insert("old.css", "bb");
        remote.insert("vendor/foo/a.js", "cc");
        remote.insert("vendor/bar/b.js", "dd");

        let mut fresh = Signatures::new();
        fresh.insert("vendor/foo/new.js", "ee");

        let merged = remote.replace_namespace(&Namespace::Vendor("foo".into()), &fresh);
        assert_eq!(merged.get("index.html"), Some("aa"));
        assert_eq!(merged.get("old.css"), Some("bb"));
        assert_eq!(merged.get("vendor/bar/b.js"), Some("dd"));
        assert_eq!(merged.get("vendor/foo/a.js"), None);
        assert_eq!(merged.get("vendor/foo/new.js"), Some("ee"));
    }
}

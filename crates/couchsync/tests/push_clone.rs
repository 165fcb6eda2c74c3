//! Push a project, clone it back, and compare.

use std::time::Duration;

use couchsync::core::{Document, FieldValue};
use couchsync::store::{DocumentStore, MemoryStore};
use couchsync::sync::serialize_dir;
use couchsync::{clone_app, Project, SyncConfig};
use couchsync_testkit::{project_tree, write_tree, ProjectFixture};
use proptest::prelude::*;
use serde_json::{json, Value};

fn config() -> SyncConfig {
    SyncConfig {
        retry_backoff: Duration::ZERO,
        ..SyncConfig::default()
    }
}

fn design(store: &MemoryStore) -> Document {
    store.get("_design/blog").unwrap().unwrap()
}

#[test]
fn test_push_builds_design_document() {
    let blog = ProjectFixture::blog();
    let project = Project::open(blog.root(), config()).unwrap();
    assert!(project.warnings().is_empty());

    let report = project.push_to(&blog.store, "blog").unwrap();
    assert_eq!(
        report.index_url.as_deref(),
        Some("memory://memory/_design/blog/index.html")
    );
    assert_eq!(
        report.attachments.uploaded,
        vec![
            "css/site.css",
            "index.html",
            "vendor/couchapp/jquery.couch.js"
        ]
    );

    let doc = design(&blog.store);
    assert_eq!(doc.body["language"], json!("javascript"));
    assert_eq!(doc.body["options"], json!({"local_seq": true}));
    assert_eq!(doc.body["views"]["recent"]["reduce"], json!("_count"));

    let map = doc.body["views"]["recent"]["map"].as_str().unwrap();
    assert!(map.contains("function markdown(s)"));
    assert!(!map.contains("!code"));
    let show = doc.body["shows"]["post"].as_str().unwrap();
    assert!(show.contains(r#"var couchapp = {"name":"Blog"};"#));

    let meta = doc.meta();
    assert_eq!(meta.extra.get("name"), Some(&json!("Blog")));
    assert_eq!(meta.objects.len(), 2);
    assert_eq!(meta.signatures.len(), 3);
    assert!(meta.manifest.as_slice().contains(&"views/recent/map.js".to_string()));
    assert_eq!(doc.attachments.len(), 3);
}

#[test]
fn test_clone_restores_project() {
    let blog = ProjectFixture::blog();
    Project::open(blog.root(), config())
        .unwrap()
        .push_to(&blog.store, "blog")
        .unwrap();

    let copy = ProjectFixture::new();
    let report = clone_app(&blog.store, "_design/blog", copy.root()).unwrap();
    assert!(report.files.from_fallback.iter().all(|p| p.ends_with("couchapp.json")));
    assert_eq!(report.attachments.downloaded.len(), 3);

    // macro directives come back verbatim
    assert_eq!(copy.read("views/recent/map.js"), blog.read("views/recent/map.js"));
    assert_eq!(copy.read("shows/post.js"), blog.read("shows/post.js"));
    assert_eq!(copy.read("lib/markdown.js"), blog.read("lib/markdown.js"));
    assert_eq!(
        copy.read("vendor/couchapp/_attachments/jquery.couch.js"),
        "/* couch */"
    );

    let meta: Value = serde_json::from_str(&copy.read("couchapp.json")).unwrap();
    assert_eq!(meta, json!({"name": "Blog", "description": "A blog"}));

    let original = serialize_dir(blog.root()).unwrap();
    let cloned = serialize_dir(copy.root()).unwrap();
    assert_eq!(cloned.fields, original.fields);
    assert_eq!(cloned.manifest, original.manifest);
}

#[test]
fn test_second_push_transfers_nothing() {
    let blog = ProjectFixture::blog();
    let project = Project::open(blog.root(), config()).unwrap();
    project.push_to(&blog.store, "blog").unwrap();
    blog.store.clear_history();

    let report = project.push_to(&blog.store, "blog").unwrap();
    assert!(report.attachments.uploaded.is_empty());
    assert!(report.attachments.deleted.is_empty());
    assert_eq!(report.attachments.unchanged.len(), 3);
    assert!(blog.store.uploads().is_empty());
    assert_eq!(design(&blog.store).attachments.len(), 3);
}

#[test]
fn test_push_after_local_changes() {
    let blog = ProjectFixture::blog();
    Project::open(blog.root(), config())
        .unwrap()
        .push_to(&blog.store, "blog")
        .unwrap();

    blog.write("_attachments/index.html", "<html>v2</html>")
        .remove("_attachments/css")
        .remove("options.json");
    let report = Project::open(blog.root(), config())
        .unwrap()
        .push_to(&blog.store, "blog")
        .unwrap();

    assert_eq!(report.attachments.uploaded, vec!["index.html"]);
    assert_eq!(report.attachments.deleted, vec!["css/site.css"]);
    let doc = design(&blog.store);
    assert!(doc.body.get("options").is_none());
    assert!(doc.attachments.contains_key("vendor/couchapp/jquery.couch.js"));
    assert_eq!(doc.meta().signatures.len(), 2);
}

#[test]
fn test_clone_foreign_document_uses_fallback() {
    let store = MemoryStore::new();
    let mut doc = Document::new("_design/legacy");
    doc.body = json!({
        "language": "javascript",
        "views": {"all": {"map": "function(doc){ emit(null, doc); }"}},
        "lists": {"feed": "function(head, req){}"},
        "rewrites": [{"from": "", "to": "index.html"}]
    })
    .as_object()
    .cloned()
    .unwrap();
    store.put(&doc).unwrap();

    let copy = ProjectFixture::new();
    let report = clone_app(&store, "_design/legacy", copy.root()).unwrap();
    assert!(report.files.from_manifest.is_empty());
    assert_eq!(copy.read("language"), "javascript");
    assert_eq!(copy.read("views/all/map.js"), "function(doc){ emit(null, doc); }");
    assert_eq!(copy.read("lists/feed.js"), "function(head, req){}");
    assert!(copy.exists("rewrites.json"));

    // the clone pushes back to the same body
    Project::open(copy.root(), config())
        .unwrap()
        .push_to(&store, "legacy")
        .unwrap();
    let pushed = store.get("_design/legacy").unwrap().unwrap();
    for key in ["language", "views", "lists", "rewrites"] {
        assert_eq!(pushed.body[key], doc.body[key], "{key}");
    }
}

#[test]
fn test_push_to_many_targets() {
    let blog = ProjectFixture::blog();
    let project = Project::open(blog.root(), config()).unwrap();
    let a = MemoryStore::named("a");
    let b = MemoryStore::named("b");

    let report = project.push(&[&a, &b], "blog");
    assert!(report.is_success());
    assert_eq!(design(&a).body, design(&b).body);
}

#[test]
fn test_abandoned_upload_is_retried_next_push() {
    let blog = ProjectFixture::blog();
    let project = Project::open(blog.root(), config()).unwrap();
    blog.store.put(&Document::new("_design/blog")).unwrap();
    blog.store.fail_next_uploads(4);

    let report = project.push_to(&blog.store, "blog").unwrap();
    assert_eq!(report.attachments.warnings.len(), 1);
    assert_eq!(report.attachments.uploaded.len(), 2);
    assert_eq!(design(&blog.store).meta().signatures.len(), 2);

    let report = project.push_to(&blog.store, "blog").unwrap();
    assert_eq!(report.attachments.uploaded, vec!["css/site.css"]);
    assert_eq!(design(&blog.store).meta().signatures.len(), 3);
}

#[test]
fn test_name_collision_is_reported() {
    let fixture = ProjectFixture::new();
    fixture.write("lib.json", r#"{"a": 1}"#).write("lib/b.js", "b");

    // "lib" sorts before "lib.json", so the directory claims the field
    let project = Project::open(fixture.root(), config()).unwrap();
    assert_eq!(project.warnings().len(), 1);
    let doc = project.document("_design/x", None);
    assert_eq!(doc.body["lib"], json!({"b": "b"}));
}

#[test]
fn test_unresolved_json_macro_round_trips() {
    let fixture = ProjectFixture::new();
    fixture
        .write("shows/about.js", "// !json missing.key")
        .write("views/all/map.js", "function(doc){}")
        .write("views/all/reduce.js", "");

    Project::open(fixture.root(), config())
        .unwrap()
        .push_to(&fixture.store, "app")
        .unwrap();
    let doc = fixture.store.get("_design/app").unwrap().unwrap();
    assert_eq!(doc.body["shows"]["about"], json!("// !json missing.key"));
    assert_eq!(doc.meta().objects.len(), 0);

    let copy = ProjectFixture::new();
    clone_app(&fixture.store, "_design/app", copy.root()).unwrap();
    assert_eq!(copy.read("views/all/reduce.js"), "");
    assert_eq!(copy.read("shows/about.js"), "// !json missing.key");
}

#[test]
fn test_removed_metadata_key_is_dropped_on_push() {
    let fixture = ProjectFixture::new();
    fixture.write("couchapp.json", r#"{"index": "old.html", "name": "x"}"#);
    Project::open(fixture.root(), config())
        .unwrap()
        .push_to(&fixture.store, "app")
        .unwrap();

    fixture.write("couchapp.json", r#"{"name": "x"}"#);
    Project::open(fixture.root(), config())
        .unwrap()
        .push_to(&fixture.store, "app")
        .unwrap();

    let meta = fixture.store.get("_design/app").unwrap().unwrap().meta();
    assert_eq!(meta.extra.get("index"), None);
    assert_eq!(meta.extra.get("name"), Some(&json!("x")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn push_then_clone_round_trips(tree in project_tree()) {
        let source = ProjectFixture::new();
        write_tree(source.root(), &tree).unwrap();
        let store = MemoryStore::new();

        Project::open(source.root(), config())
            .unwrap()
            .push_to(&store, "app")
            .unwrap();
        let copy = ProjectFixture::new();
        clone_app(&store, "_design/app", copy.root()).unwrap();

        let original = serialize_dir(source.root()).unwrap();
        let cloned = serialize_dir(copy.root()).unwrap();
        prop_assert_eq!(&cloned.fields, &original.fields);
        prop_assert_eq!(&cloned.manifest, &original.manifest);

        // text files come back byte for byte
        for (name, value) in original.fields.iter() {
            if let FieldValue::Text(text) = value {
                prop_assert_eq!(cloned.fields.get(name).and_then(FieldValue::as_text), Some(text.as_str()));
            }
        }
    }
}

//! Push and clone.
//!
//! A [`Project`] is a directory prepared for pushing: serialized and
//! macro-expanded once, then written to any number of databases.

use std::fs;
use std::path::{Path, PathBuf};

use couchsync_core::{AppMeta, Document, FieldTree, Manifest, Namespace, ObjectStore};
use couchsync_store::DocumentStore;
use couchsync_sync::{
    expand_functions, pull_attachments, push_attachments, reconstruct, serialize_dir,
    vendor_namespaces, AttachmentReport, ReconstructReport, SyncConfig, Warning, ATTACHMENTS_DIR,
};

use crate::config::{ProjectConfig, RC_FILE};
use crate::error::{AppError, Result};

/// Prefix of every design document id.
pub const DESIGN_PREFIX: &str = "_design/";

/// Document id of the app `app_name`.
pub fn design_id(app_name: &str) -> String {
    format!("{DESIGN_PREFIX}{app_name}")
}

/// App name of a design document id.
pub fn app_name_of(doc_id: &str) -> &str {
    doc_id.strip_prefix(DESIGN_PREFIX).unwrap_or(doc_id)
}

/// Outcome of pushing to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub location: String,
    pub rev: String,
    pub attachments: AttachmentReport,
    /// Where the app's index page can be reached, if it has one.
    pub index_url: Option<String>,
}

/// Outcome of a push to several databases.
#[derive(Debug, Default)]
pub struct PushReport {
    /// Problems found while reading the project.
    pub warnings: Vec<Warning>,
    /// One entry per target, in order.
    pub targets: Vec<(String, Result<TargetReport>)>,
}

impl PushReport {
    /// Whether every target was pushed.
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|(_, result)| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &AppError)> {
        self.targets.iter().filter_map(|(location, result)| match result {
            Err(e) => Some((location.as_str(), e)),
            Ok(_) => None,
        })
    }
}

/// Outcome of a clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneReport {
    pub files: ReconstructReport,
    pub attachments: AttachmentReport,
}

/// A project directory ready to push.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: SyncConfig,
    fields: FieldTree,
    manifest: Manifest,
    objects: ObjectStore,
    warnings: Vec<Warning>,
}

impl Project {
    /// Serialize and expand the project at `root`.
    ///
    /// Fails on macro errors, before any database is contacted.
    pub fn open(root: impl Into<PathBuf>, config: SyncConfig) -> Result<Self> {
        let root = root.into();
        let serialized = serialize_dir(&root)?;
        let mut fields = serialized.fields;
        let mut warnings = serialized.warnings;

        let mut objects = ObjectStore::new();
        warnings.extend(expand_functions(&mut fields, &root, &mut objects)?);

        tracing::debug!(
            "{}: {} manifest entries, {} expanded functions",
            root.display(),
            serialized.manifest.len(),
            objects.len()
        );

        Ok(Self {
            root,
            config,
            fields,
            manifest: serialized.manifest,
            objects,
            warnings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Problems found while reading the project.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// App name used when none is given: the directory name.
    pub fn default_app_name(&self) -> Option<String> {
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        root.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }

    /// User metadata from `couchapp.json` / `couchapp/`.
    pub fn meta(&self) -> AppMeta {
        AppMeta::from_value(
            self.fields
                .get(couchsync_core::META_KEY)
                .map(|v| v.to_json())
                .as_ref(),
        )
    }

    /// Build the document to write over `existing`.
    ///
    /// Keeps the id, revision, attachment stubs and the recorded signatures
    /// of `existing`; the body is replaced and the manifest and object store
    /// are the ones just computed.
    pub fn document(&self, doc_id: &str, existing: Option<Document>) -> Document {
        let mut doc = existing.unwrap_or_else(|| Document::new(doc_id));
        let mut meta = doc.meta();

        doc.body = self.fields.to_json_map();
        meta.extra = self.meta().extra;
        meta.manifest = self.manifest.clone();
        meta.objects = self.objects.clone();
        doc.set_meta(&meta);
        doc
    }

    /// Push to one database.
    pub fn push_to<S>(&self, store: &S, app_name: &str) -> Result<TargetReport>
    where
        S: DocumentStore + ?Sized,
    {
        let doc_id = design_id(app_name);
        let location = store.location();
        tracing::info!("pushing {} to {}", doc_id, location);

        store.ensure_database()?;
        let existing = store.get(&doc_id)?;
        let rev = store.put(&self.document(&doc_id, existing))?;

        let mut attachments = push_attachments(
            store,
            &doc_id,
            &self.root.join(ATTACHMENTS_DIR),
            &Namespace::Primary,
            &self.config,
        )?;
        for (ns, dir) in vendor_namespaces(&self.root)? {
            tracing::debug!("pushing vendor attachments from {}", dir.display());
            attachments.absorb(push_attachments(store, &doc_id, &dir, &ns, &self.config)?);
        }

        let index_url = self.index_url(&location, &doc_id);
        if let Some(url) = &index_url {
            tracing::info!("visit your CouchApp here: {}", url);
        }

        Ok(TargetReport {
            location,
            rev,
            attachments,
            index_url,
        })
    }

    /// Push to every target in turn.
    ///
    /// A failing target is logged and recorded; the remaining targets are
    /// still pushed.
    pub fn push(&self, targets: &[&dyn DocumentStore], app_name: &str) -> PushReport {
        let mut report = PushReport {
            warnings: self.warnings.clone(),
            targets: Vec::with_capacity(targets.len()),
        };
        for store in targets {
            let location = store.location();
            let result = self.push_to(*store, app_name);
            if let Err(e) = &result {
                tracing::error!("push to {} failed: {}", location, e);
            }
            report.targets.push((location, result));
        }
        report
    }

    /// URL of the app's index page under `db_location`.
    pub fn index_url(&self, db_location: &str, doc_id: &str) -> Option<String> {
        let base = db_location.trim_end_matches('/');
        if let Some(index) = self.meta().index() {
            return Some(format!("{base}/{doc_id}/{index}"));
        }
        if self.root.join(ATTACHMENTS_DIR).join("index.html").is_file() {
            return Some(format!("{base}/{doc_id}/index.html"));
        }
        None
    }
}

/// Clone the design document `doc_id` into `dest`.
///
/// If `dest` is already a project (it has a `.couchapprc`), its content is
/// cleared first, keeping `.couchapprc` and `_attachments/`.
pub fn clone_app<S>(store: &S, doc_id: &str, dest: &Path) -> Result<CloneReport>
where
    S: DocumentStore + ?Sized,
{
    let location = store.location();
    tracing::info!("cloning {} from {} to {}", doc_id, location, dest.display());

    let doc = store
        .get(doc_id)?
        .ok_or_else(|| AppError::NotFound(format!("{location}/{doc_id}")))?;

    if dest.join(RC_FILE).is_file() {
        clean_project(dest)?;
    }
    fs::create_dir_all(dest).map_err(|e| AppError::io(dest, e))?;

    let mut rc = ProjectConfig::load(dest)?;
    rc.set_origin(&location);
    rc.save(dest)?;

    let files = reconstruct(&doc, dest)?;
    let attachments = pull_attachments(store, &doc, dest)?;

    Ok(CloneReport { files, attachments })
}

/// Remove everything in `dir` but `.couchapprc` and `_attachments/`.
fn clean_project(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| AppError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| AppError::io(dir, e))?;
        let name = entry.file_name();
        if name == RC_FILE || name == ATTACHMENTS_DIR {
            continue;
        }
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| AppError::io(&path, e))?;
    }
    Ok(())
}

//! Attachment sync, diffed by content digest.
//!
//! The `couchapp.signatures` table on the design document maps each
//! attachment name to the digest of the file it was uploaded from. A push
//! compares local digests against it and only transfers what changed; a clone
//! compares it against local files and only downloads what differs.
//!
//! Each pass is scoped to one [`Namespace`]: the project's own
//! `_attachments/`, or one vendor package's `vendor/<name>/_attachments/`.
//! Entries of other namespaces are never read for deletion and are carried
//! over untouched when the table is written back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::thread;

use bytes::Bytes;
use couchsync_core::{CoreError, Digest, Document, Namespace, Signatures};
use couchsync_store::{DocumentStore, DocumentStoreExt};
use walkdir::{DirEntry, WalkDir};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::report::{AttachmentReport, Warning};
use crate::tree::{sorted_entries, ATTACHMENTS_DIR, VENDOR_DIR};

/// A file found under a local attachments directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub digest: Digest,
}

/// Attachment name to local file, for one namespace.
pub type LocalAttachments = BTreeMap<String, LocalFile>;

/// What a push of one namespace will do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentPlan {
    /// Local files that are new or changed.
    pub upload: Vec<String>,
    /// Stored attachments with no local file.
    pub delete: Vec<String>,
    /// Local files matching their recorded signature.
    pub unchanged: Vec<String>,
    /// The signature table to write back if every upload succeeds.
    pub signatures: Signatures,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Collect every non-hidden file under `dir`, named within `ns`.
///
/// A missing directory has no attachments.
pub fn collect_local(dir: &Path, ns: &Namespace) -> Result<LocalAttachments> {
    let mut local = LocalAttachments::new();
    if !dir.is_dir() {
        return Ok(local);
    }

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SyncError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let digest = Digest::of_file(path).map_err(|e| match e {
            CoreError::Io(source) => SyncError::io(path, source),
            other => other.into(),
        })?;
        local.insert(
            ns.qualify(&rel),
            LocalFile {
                path: path.to_path_buf(),
                digest,
            },
        );
    }
    Ok(local)
}

/// Diff local files against the recorded signatures of `ns`.
///
/// `stored` lists the attachment names currently on the document. A local
/// file is unchanged only if it is stored and its digest matches the
/// recorded signature. Only names with a recorded signature are deleted;
/// attachments written by other tools are left alone.
pub fn plan(
    local: &LocalAttachments,
    remote: &Signatures,
    stored: &BTreeSet<String>,
    ns: &Namespace,
) -> AttachmentPlan {
    let mut plan = AttachmentPlan::default();

    for (name, file) in local {
        let recorded = remote.get(name).and_then(|hex| Digest::from_hex(hex).ok());
        if stored.contains(name) && recorded == Some(file.digest) {
            plan.unchanged.push(name.clone());
        } else {
            plan.upload.push(name.clone());
        }
    }
    plan.delete = remote
        .in_namespace(ns)
        .filter(|(name, _)| !local.contains_key(*name))
        .map(|(name, _)| name.clone())
        .collect();

    let fresh: Signatures = local
        .iter()
        .map(|(name, file)| (name.clone(), file.digest.to_hex()))
        .collect();
    plan.signatures = remote.replace_namespace(ns, &fresh);
    plan
}

/// Push the attachments of one namespace from `dir` to the document `doc_id`.
///
/// The document must exist. Uploads failing with a transient error are
/// retried; once the retry bound is reached the file is skipped with a
/// warning and left out of the signature table.
pub fn push_attachments<S>(
    store: &S,
    doc_id: &str,
    dir: &Path,
    ns: &Namespace,
    config: &SyncConfig,
) -> Result<AttachmentReport>
where
    S: DocumentStore + ?Sized,
{
    let local = collect_local(dir, ns)?;
    let doc = store.require(doc_id)?;
    let stored: BTreeSet<String> = doc.attachments.keys().cloned().collect();
    let plan = plan(&local, &doc.meta().signatures, &stored, ns);

    tracing::debug!(
        "{:?}: {} to upload, {} to delete, {} unchanged",
        ns,
        plan.upload.len(),
        plan.delete.len(),
        plan.unchanged.len()
    );

    let mut report = AttachmentReport {
        unchanged: plan.unchanged.clone(),
        ..Default::default()
    };
    let mut rev = doc.rev.clone();

    for name in &plan.delete {
        // already gone from the document; only the signature needs dropping
        if stored.contains(name) {
            tracing::debug!("delete attachment {}", name);
            let current = rev.as_deref().unwrap_or_default();
            rev = Some(store.delete_attachment(doc_id, current, name)?);
        }
        report.deleted.push(name.clone());
    }

    let mut abandoned = Vec::new();
    for name in &plan.upload {
        let Some(file) = local.get(name) else {
            continue;
        };
        match upload_with_retry(store, doc_id, rev.as_deref(), name, file, config)? {
            Ok(new_rev) => {
                rev = Some(new_rev);
                report.uploaded.push(name.clone());
            }
            Err(reason) => {
                report.warnings.push(
                    Warning::UploadAbandoned {
                        name: name.clone(),
                        reason,
                    }
                    .emit(),
                );
                abandoned.push(name.clone());
            }
        }
    }

    let signatures = plan
        .signatures
        .iter()
        .filter(|(name, _)| !abandoned.contains(name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    write_signatures(store, doc_id, signatures)?;

    Ok(report)
}

/// Upload one file. The inner `Err` carries the reason it was abandoned.
fn upload_with_retry<S>(
    store: &S,
    doc_id: &str,
    rev: Option<&str>,
    name: &str,
    file: &LocalFile,
    config: &SyncConfig,
) -> Result<std::result::Result<String, String>>
where
    S: DocumentStore + ?Sized,
{
    let content = Bytes::from(fs::read(&file.path).map_err(|e| SyncError::io(&file.path, e))?);
    let content_type = content_type(&file.path);
    let mut attempt = 0;

    loop {
        tracing::debug!("upload attachment {} ({})", name, content_type);
        match store.put_attachment(doc_id, rev, name, content.clone(), content_type) {
            Ok(new_rev) => return Ok(Ok(new_rev)),
            Err(e) if e.is_transient() && attempt < config.upload_retries => {
                attempt += 1;
                tracing::debug!(
                    "retrying {} after error: {} ({}/{})",
                    name,
                    e,
                    attempt,
                    config.upload_retries
                );
                thread::sleep(config.retry_backoff);
            }
            Err(e) if e.is_transient() => return Ok(Err(e.to_string())),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Store `signatures` on the document unless they are already current.
fn write_signatures<S>(store: &S, doc_id: &str, signatures: Signatures) -> Result<()>
where
    S: DocumentStore + ?Sized,
{
    let mut doc = store.require(doc_id)?;
    let mut meta = doc.meta();
    if meta.signatures == signatures {
        return Ok(());
    }
    meta.signatures = signatures;
    doc.set_meta(&meta);
    store.put(&doc)?;
    Ok(())
}

/// Vendor packages under `root/vendor` that carry their own attachments.
pub fn vendor_namespaces(root: &Path) -> Result<Vec<(Namespace, PathBuf)>> {
    let vendor_dir = root.join(VENDOR_DIR);
    if !vendor_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    // skipped names are logged; they cannot name a namespace
    let mut skipped = Vec::new();
    for (name, path, is_dir) in sorted_entries(&vendor_dir, &mut skipped)? {
        if !is_dir || name.starts_with('.') {
            continue;
        }
        let attachments = path.join(ATTACHMENTS_DIR);
        if attachments.is_dir() {
            found.push((Namespace::Vendor(name), attachments));
        }
    }
    Ok(found)
}

/// Local path an attachment name is cloned to.
///
/// `None` for names that would escape the project directory.
pub fn local_path(root: &Path, name: &str) -> Option<PathBuf> {
    let (ns, rel) = Namespace::split(name);
    let rel = Path::new(rel);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    let base = match ns {
        Namespace::Primary => root.join(ATTACHMENTS_DIR),
        Namespace::Vendor(vendor) => root.join(VENDOR_DIR).join(vendor).join(ATTACHMENTS_DIR),
    };
    Some(base.join(rel))
}

/// Download every attachment of `doc` whose local copy is missing or differs
/// from its recorded signature.
pub fn pull_attachments<S>(store: &S, doc: &Document, root: &Path) -> Result<AttachmentReport>
where
    S: DocumentStore + ?Sized,
{
    let signatures = doc.meta().signatures;
    let mut report = AttachmentReport::default();

    for name in doc.attachments.keys() {
        let Some(path) = local_path(root, name) else {
            tracing::warn!("skipping attachment with unsafe name {}", name);
            continue;
        };
        let current = if path.is_file() {
            Digest::of_file(&path).ok().map(|d| d.to_hex())
        } else {
            None
        };
        if current.is_some() && current.as_deref() == signatures.get(name) {
            report.unchanged.push(name.clone());
            continue;
        }

        tracing::debug!("clone attachment: {}", name);
        let content = store.get_attachment(&doc.id, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        fs::write(&path, &content).map_err(|e| SyncError::io(&path, e))?;
        report.downloaded.push(name.clone());
    }
    Ok(report)
}

/// Content type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|x| x.to_str())
        .map(|x| x.to_ascii_lowercase())
    {
        Some(ext) if ext == "html" || ext == "htm" => "text/html",
        Some(ext) if ext == "css" => "text/css",
        Some(ext) if ext == "js" => "application/javascript",
        Some(ext) if ext == "json" => "application/json",
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "md" || ext == "markdown" => "text/markdown",
        Some(ext) if ext == "xml" => "application/xml",
        Some(ext) if ext == "svg" => "image/svg+xml",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "ico" => "image/x-icon",
        Some(ext) if ext == "woff" => "font/woff",
        Some(ext) if ext == "woff2" => "font/woff2",
        Some(ext) if ext == "ttf" => "font/ttf",
        Some(ext) if ext == "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

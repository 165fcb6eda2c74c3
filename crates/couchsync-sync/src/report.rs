//! Warnings and per-operation reports.

use std::fmt;
use std::path::PathBuf;

/// A recovered condition. The operation carried on past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Two entries mapped to the same field name; the later one was dropped.
    NameCollision { path: PathBuf, field: String },
    /// A file was not valid UTF-8; its field was left empty.
    Decode { path: PathBuf },
    /// An entry name was not valid UTF-8; the entry was skipped.
    UndecodableName { path: PathBuf },
    /// A `.json` file did not parse; its raw text was kept.
    Parse { path: PathBuf, reason: String },
    /// An attachment upload kept failing and was skipped.
    UploadAbandoned { name: String, reason: String },
}

impl Warning {
    /// Log at warn level and hand the warning back for collection.
    pub(crate) fn emit(self) -> Self {
        tracing::warn!("{}", self);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NameCollision { path, field } => write!(
                f,
                "{} is already in properties, can't add {}",
                field,
                path.display()
            ),
            Warning::Decode { path } => {
                write!(f, "{} is not valid UTF-8, pushed as empty", path.display())
            }
            Warning::UndecodableName { path } => {
                write!(f, "name of {} is not valid UTF-8, skipped", path.display())
            }
            Warning::Parse { path, reason } => {
                write!(f, "invalid JSON in {} ({}), pushed as text", path.display(), reason)
            }
            Warning::UploadAbandoned { name, reason } => {
                write!(f, "{} not uploaded: {}", name, reason)
            }
        }
    }
}

/// Outcome of syncing one attachment namespace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttachmentReport {
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    pub downloaded: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl AttachmentReport {
    /// Fold another namespace's report into this one.
    pub fn absorb(&mut self, other: AttachmentReport) {
        self.uploaded.extend(other.uploaded);
        self.deleted.extend(other.deleted);
        self.unchanged.extend(other.unchanged);
        self.downloaded.extend(other.downloaded);
        self.warnings.extend(other.warnings);
    }
}

/// Outcome of reconstructing a project directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconstructReport {
    /// Files written while replaying the manifest.
    pub from_manifest: Vec<PathBuf>,
    /// Files written for keys the manifest did not cover.
    pub from_fallback: Vec<PathBuf>,
}

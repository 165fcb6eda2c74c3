//! The `.couchapprc` project file.
//!
//! ```json
//! {
//!   "env": {
//!     "default": { "db": "http://127.0.0.1:5984/blog" },
//!     "prod": { "db": ["https://a.example.com/blog", "https://b.example.com/blog"] }
//!   }
//! }
//! ```
//!
//! Keys the tool does not know are kept when the file is rewritten.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use couchsync_store::DEFAULT_SERVER_URI;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// File name of the project config, at the project root.
pub const RC_FILE: &str = ".couchapprc";

/// Env used when no database is named.
pub const DEFAULT_ENV: &str = "default";

/// Env recording where a clone came from.
pub const ORIGIN_ENV: &str = "origin";

/// One database URL or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbUrls {
    One(String),
    Many(Vec<String>),
}

impl DbUrls {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            DbUrls::One(url) => vec![url.clone()],
            DbUrls::Many(urls) => urls.clone(),
        }
    }
}

/// A named environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<DbUrls>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of `.couchapprc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, EnvEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectConfig {
    /// Load `dir/.couchapprc`; a missing file is an empty config.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(RC_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| AppError::io(&path, e))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&text).map_err(|e| AppError::Config {
            path,
            reason: e.to_string(),
        })
    }

    /// Write `dir/.couchapprc`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(RC_FILE);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|e| AppError::io(&path, e))
    }

    /// Database URLs for a push.
    ///
    /// - an argument containing `/` is a URL,
    /// - otherwise it names an env, falling back to a database of that name
    ///   on the default server,
    /// - no argument uses the `default` env.
    pub fn resolve_targets(&self, arg: Option<&str>) -> Result<Vec<String>> {
        match arg {
            Some(url) if url.contains('/') => Ok(vec![url.to_string()]),
            Some(name) => Ok(self
                .env_urls(name)
                .unwrap_or_else(|| vec![format!("{DEFAULT_SERVER_URI}{name}")])),
            None => self.env_urls(DEFAULT_ENV).ok_or(AppError::NoTarget),
        }
    }

    fn env_urls(&self, name: &str) -> Option<Vec<String>> {
        self.env
            .get(name)
            .and_then(|entry| entry.db.as_ref())
            .map(DbUrls::to_vec)
            .filter(|urls| !urls.is_empty())
    }

    /// Record the database a project was cloned from.
    pub fn set_origin(&mut self, url: &str) {
        self.env.entry(ORIGIN_ENV.to_string()).or_default().db = Some(DbUrls::One(url.to_string()));
    }
}

/// Create `.couchapprc` in an existing project directory.
///
/// Returns `false` if the directory was already initialized.
pub fn init(dir: &Path, db_url: Option<&str>) -> Result<bool> {
    if !dir.is_dir() {
        return Err(AppError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory doesn't exist"),
        ));
    }
    if dir.join(RC_FILE).is_file() {
        tracing::warn!("CouchApp already initialized in {}", dir.display());
        return Ok(false);
    }

    let mut config = ProjectConfig::default();
    if let Some(url) = db_url {
        config.env.insert(
            DEFAULT_ENV.to_string(),
            EnvEntry {
                db: Some(DbUrls::One(url.to_string())),
                ..Default::default()
            },
        );
    }
    config.save(dir)?;
    Ok(true)
}

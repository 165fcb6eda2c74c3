use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use couchsync::{app_name_of, clone_app};
use couchsync_store::{parse_db_url, CouchStore};

#[derive(ClapArgs)]
pub struct Args {
    /// Design document URL, e.g. http://127.0.0.1:5984/blog/_design/blog
    pub url: String,

    /// Destination directory; defaults to the app name
    pub dir: Option<PathBuf>,
}

pub fn execute(args: Args) -> Result<()> {
    let parsed = parse_db_url(&args.url)?;
    let doc_id = parsed
        .doc_id
        .ok_or_else(|| anyhow::anyhow!("{} does not name a design document", args.url))?;
    let dest = args
        .dir
        .unwrap_or_else(|| PathBuf::from(app_name_of(&doc_id)));

    let store = CouchStore::from_url(&args.url)?;
    let report = clone_app(&store, &doc_id, &dest)
        .with_context(|| format!("failed to clone {}", args.url))?;

    tracing::info!(
        "{} cloned to {}: {} files, {} attachments",
        doc_id,
        dest.display(),
        report.files.from_manifest.len() + report.files.from_fallback.len(),
        report.attachments.downloaded.len()
    );
    Ok(())
}

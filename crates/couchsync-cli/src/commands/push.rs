use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use couchsync::{DocumentStore, Project, ProjectConfig, SyncConfig};
use couchsync_store::CouchStore;

#[derive(ClapArgs)]
pub struct Args {
    /// Project directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// App name; defaults to the directory name
    pub app_name: Option<String>,

    /// Database URL or env name from .couchapprc
    #[arg(long)]
    pub db: Option<String>,

    /// Retries after a failed attachment upload
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
}

pub fn execute(args: Args) -> Result<()> {
    let rc = ProjectConfig::load(&args.dir)?;
    let urls = rc.resolve_targets(args.db.as_deref())?;

    let config = SyncConfig {
        upload_retries: args.retries,
        ..SyncConfig::default()
    };
    let project = Project::open(&args.dir, config)
        .with_context(|| format!("failed to read project {}", args.dir.display()))?;

    let app_name = match args.app_name {
        Some(name) => name,
        None => project
            .default_app_name()
            .ok_or_else(|| anyhow::anyhow!("cannot name app after {}", args.dir.display()))?,
    };

    let stores = urls
        .iter()
        .map(|url| CouchStore::from_url(url).with_context(|| format!("bad database url {url}")))
        .collect::<Result<Vec<_>>>()?;
    let targets: Vec<&dyn DocumentStore> = stores.iter().map(|s| s as &dyn DocumentStore).collect();

    let report = project.push(&targets, &app_name);
    for (location, result) in &report.targets {
        if let Ok(target) = result {
            tracing::info!(
                "{}: rev {}, {} uploaded, {} deleted, {} unchanged, {} warnings",
                location,
                target.rev,
                target.attachments.uploaded.len(),
                target.attachments.deleted.len(),
                target.attachments.unchanged.len(),
                target.attachments.warnings.len()
            );
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("push failed for {} of {} databases", failed, report.targets.len());
    }
    Ok(())
}

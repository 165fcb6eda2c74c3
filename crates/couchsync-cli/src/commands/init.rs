use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;

#[derive(ClapArgs)]
pub struct Args {
    /// Project directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Database to record as the default push target
    pub db_url: Option<String>,
}

pub fn execute(args: Args) -> Result<()> {
    if couchsync::init(&args.dir, args.db_url.as_deref())? {
        tracing::info!("{} created in {}", couchsync::RC_FILE, args.dir.display());
    }
    Ok(())
}

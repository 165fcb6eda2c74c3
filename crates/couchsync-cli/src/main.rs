#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{clone, init, push};

#[derive(Parser)]
#[command(name = "couchsync")]
#[command(author, version, about = "Sync a project directory with a CouchDB design document")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a .couchapprc in a project directory
    Init(init::Args),

    /// Push a project to one or more databases
    Push(push::Args),

    /// Clone a design document into a directory
    Clone(clone::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init(args) => init::execute(args),
        Commands::Push(args) => push::execute(args),
        Commands::Clone(args) => clone::execute(args),
    }
}

//! # Workbench Runtime
//!
//! Entry point for the `workbench` binary. Parses the command line, installs
//! the log subscriber and hands over to [`app::run`].
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

mod app;
mod watcher;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use workbench::config::Cli;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    app::run(&cli)
}

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quarry_cli::{cli::Cli, commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over the flags when set
    let env_filter = EnvFilter::builder()
        .with_default_directive(cli.level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    commands::execute(cli)
}

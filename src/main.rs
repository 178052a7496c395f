use clap::Parser;

use dropshelf_lib::bootstrap;
use dropshelf_lib::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = bootstrap::load_or_default(cli.config.clone())?.log_dir;
    bootstrap::init_tracing_subscriber(log_dir.as_deref())?;

    if !cli::run(cli).await? {
        std::process::exit(1);
    }
    Ok(())
}

//! pybridge CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pybridge_cli::cmd::{self, CmdContext};
use pybridge_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = CmdContext::from_cli(&cli);

    match cli.command {
        Commands::Status { backend, json } => cmd::status::status(&ctx, backend.as_deref(), json),
        Commands::Install {
            backend,
            force,
            timeout,
        } => cmd::install::install(&ctx, &backend, force, timeout).await,
        Commands::Bridges => cmd::bridges::bridges(&ctx),
        Commands::Reset { legacy, yes } => cmd::reset::reset(&ctx, legacy, yes),
        Commands::Clean => cmd::clean::clean(ctx.dry_run),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}

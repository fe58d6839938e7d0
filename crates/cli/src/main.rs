use clap::Parser;
use std::path::PathBuf;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "apkforge")]
#[command(about = "Cached, bounded APK renaming with a secure archive extractor", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for the provisioned runtime and tool
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for cached artifacts
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Maximum number of simultaneous tool runs
    #[arg(long, global = true, value_name = "N")]
    max_concurrent: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    apkforge_utils::tracing::init(cli.verbose)
        .map_err(|e| eyre::eyre!("failed to initialize logging: {e}"))?;

    let mut builder = apkforge_config::ForgeConfig::builder().from_env()?;
    if let Some(dir) = cli.data_dir {
        builder = builder.with_data_dir(dir);
    }
    if let Some(dir) = cli.cache_dir {
        builder = builder.with_cache_dir(dir);
    }
    if let Some(max) = cli.max_concurrent {
        builder = builder.with_max_concurrent(max);
    }

    cli.command.execute(builder).await?;
    Ok(())
}

use apkforge_config::ForgeConfigBuilder;
use apkforge_core::{ProcessingOptions, Result};
use apkforge_utils::ArchiveFormat;
use clap::{Args, Subcommand};
use std::path::PathBuf;

pub mod cache;
pub mod extract;
pub mod fingerprint;
pub mod process;
pub mod provision;

use self::cache::CacheCommands;

/// Rename options shared by `process` and `fingerprint`
#[derive(Args, Debug, Clone, Default)]
pub struct RenameArgs {
    /// New package identifier
    #[arg(short = 'p', long = "package", value_name = "ID")]
    pub target_identifier: Option<String>,

    /// New application display name
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub display_name: Option<String>,

    /// Replacement icon
    #[arg(short = 'i', long = "icon", value_name = "FILE")]
    pub icon: Option<PathBuf>,

    /// Rename deep references too
    #[arg(short = 'd', long = "deep")]
    pub deep: bool,
}

impl RenameArgs {
    pub fn to_options(&self) -> ProcessingOptions {
        let mut options = ProcessingOptions::new().with_deep(self.deep);
        if let Some(id) = &self.target_identifier {
            options = options.with_target_identifier(id.clone());
        }
        if let Some(name) = &self.display_name {
            options = options.with_display_name(name.clone());
        }
        if let Some(icon) = &self.icon {
            options = options.with_icon(icon.clone());
        }
        options
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rename an artifact, reusing a cached result when available
    Process {
        /// Input artifact
        input: PathBuf,

        /// Directory receiving the result
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        #[command(flatten)]
        rename: RenameArgs,

        /// Runtime executable to use instead of a provisioned one
        #[arg(long, value_name = "PATH")]
        runtime: Option<PathBuf>,

        /// Tool program file to use instead of a provisioned one
        #[arg(long, value_name = "PATH")]
        tool: Option<PathBuf>,

        /// Never download; use configured paths or the runtime on PATH
        #[arg(long)]
        no_provision: bool,
    },

    /// Print the cache fingerprint of an artifact and options
    Fingerprint {
        /// Input artifact
        input: PathBuf,

        #[command(flatten)]
        rename: RenameArgs,

        /// Also print what went into the digest, as JSON
        #[arg(long)]
        explain: bool,
    },

    /// Extract an archive, skipping entries that escape the destination
    Extract {
        /// Archive to extract
        archive: PathBuf,

        /// Destination directory
        dest: PathBuf,

        /// Archive format; detected from the file name when omitted
        #[arg(long, value_name = "FORMAT")]
        format: Option<ArchiveFormat>,
    },

    /// Download the runtime and tool if they are not present
    Provision,

    /// Inspect the artifact cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

impl Commands {
    pub async fn execute(self, config: ForgeConfigBuilder) -> Result<()> {
        match self {
            Commands::Process {
                input,
                out,
                rename,
                runtime,
                tool,
                no_provision,
            } => {
                let mut config = config;
                if let Some(runtime) = runtime {
                    config = config.with_runtime_path(runtime);
                }
                if let Some(tool) = tool {
                    config = config.with_tool_path(tool);
                }
                process::execute(config.build()?, input, out, rename.to_options(), no_provision)
                    .await
            }
            Commands::Fingerprint {
                input,
                rename,
                explain,
            } => fingerprint::execute(input, rename.to_options(), explain).await,
            Commands::Extract {
                archive,
                dest,
                format,
            } => extract::execute(archive, dest, format).await,
            Commands::Provision => provision::execute(config.build()?).await,
            Commands::Cache { command } => command.execute(config.build()?).await,
        }
    }
}

use apkforge_cache::ArtifactStore;
use apkforge_config::ForgeConfig;
use apkforge_core::{Fingerprint, Result};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print where the artifact for a fingerprint lives and whether it exists
    Path {
        /// 64-character hex fingerprint
        fingerprint: Fingerprint,
    },
    /// Print the cache directory
    Dir,
}

impl CacheCommands {
    pub async fn execute(self, config: ForgeConfig) -> Result<()> {
        let store = ArtifactStore::new(&config.cache_dir, &config.artifact_extension);
        match self {
            CacheCommands::Path { fingerprint } => {
                let path = store.path_for(&fingerprint);
                let state = if store.lookup(&fingerprint).is_some() {
                    "present"
                } else {
                    "absent"
                };
                println!("{} ({state})", path.display());
                Ok(())
            }
            CacheCommands::Dir => {
                println!("{}", store.root().display());
                Ok(())
            }
        }
    }
}

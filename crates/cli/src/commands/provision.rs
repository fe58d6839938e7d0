use apkforge_config::ForgeConfig;
use apkforge_core::Result;
use apkforge_provision::Provisioner;

pub async fn execute(config: ForgeConfig) -> Result<()> {
    let toolchain = Provisioner::new(config)?.ensure_all().await?;
    println!("runtime: {}", toolchain.runtime.display());
    println!("tool: {}", toolchain.tool.display());
    Ok(())
}

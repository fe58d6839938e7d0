use apkforge_core::{Error, Result};
use apkforge_utils::{extract, ArchiveFormat};
use std::path::PathBuf;

pub async fn execute(archive: PathBuf, dest: PathBuf, format: Option<ArchiveFormat>) -> Result<()> {
    let format = match format.or_else(|| ArchiveFormat::from_path(&archive)) {
        Some(format) => format,
        None => {
            return Err(Error::configuration(format!(
                "cannot tell the format of '{}'; pass --format tar-gz or --format zip",
                archive.display()
            )))
        }
    };

    let report = tokio::task::spawn_blocking(move || extract(&archive, &dest, format))
        .await
        .map_err(|e| Error::configuration(format!("extraction task failed: {e}")))??;

    println!(
        "extracted {} files, {} directories; ignored {} links; skipped {} unsafe entries",
        report.files,
        report.directories,
        report.ignored,
        report.skipped.len()
    );
    for entry in &report.skipped {
        println!("  skipped: {entry}");
    }
    Ok(())
}

use apkforge_cache::fingerprint_with_manifest;
use apkforge_core::{Error, ProcessingOptions, ProcessingRequest, Result};
use std::path::PathBuf;

pub async fn execute(input: PathBuf, options: ProcessingOptions, explain: bool) -> Result<()> {
    if !input.is_file() {
        return Err(Error::input_not_found(input));
    }

    // Destination plays no part in the fingerprint
    let request = ProcessingRequest::new(input, PathBuf::new(), options);
    let (fingerprint, manifest) =
        tokio::task::spawn_blocking(move || fingerprint_with_manifest(&request))
            .await
            .map_err(|e| Error::configuration(format!("fingerprint task failed: {e}")))??;

    println!("{fingerprint}");
    if explain {
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::configuration(format!("failed to render manifest: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

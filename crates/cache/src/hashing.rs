use apkforge_core::{Error, Fingerprint, ProcessingOptions, ProcessingRequest, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Content hasher producing request fingerprints
#[derive(Debug)]
pub struct ContentHasher {
    hasher: Sha256,
    /// Metadata about what was hashed
    pub manifest: HashManifest,
}

/// Manifest describing the inputs of one fingerprint, for diagnostics
#[derive(Debug, Default, Clone, Serialize)]
pub struct HashManifest {
    /// Ordered list of hashed components
    pub inputs: Vec<String>,
    /// Per-file SHA-256 of every hashed file (path -> hex digest)
    pub files: Vec<(String, String)>,
}

impl ContentHasher {
    /// Create a new, empty hasher
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            manifest: HashManifest::default(),
        }
    }

    /// Hash a file's full content under `name`, streaming it in chunks.
    ///
    /// The file's own SHA-256 enters the digest as a framed field, so file
    /// bytes cannot run into the fields around them.
    pub fn hash_file(&mut self, name: &str, file_path: &Path) -> Result<()> {
        let file = File::open(file_path)
            .map_err(|e| Error::hashing_failed(file_path.to_path_buf(), e))?;

        let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
        let mut file_hasher = Sha256::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| Error::hashing_failed(file_path.to_path_buf(), e))?;

            if bytes_read == 0 {
                break;
            }

            file_hasher.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        let digest = file_hasher.finalize();
        self.update_field(name, &digest);

        let path_str = file_path.to_string_lossy().into_owned();
        self.manifest
            .files
            .push((path_str.clone(), format!("{digest:x}")));
        self.manifest.inputs.push(format!("file:{path_str}:{total}"));

        Ok(())
    }

    /// Hash one named field.
    ///
    /// Encoded as `name 0x00 len 0x00 value` so neighbouring fields can never
    /// alias each other.
    pub fn hash_field(&mut self, name: &str, value: &[u8]) {
        self.update_field(name, value);
        self.manifest
            .inputs
            .push(format!("field:{name}:{}", value.len()));
    }

    fn update_field(&mut self, name: &str, value: &[u8]) {
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(value.len().to_string().as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(value);
    }

    /// Hash every option in fixed order, independent of how it was built
    pub fn hash_options(&mut self, options: &ProcessingOptions) {
        self.hash_field(
            "target_identifier",
            options.target_identifier().unwrap_or_default().as_bytes(),
        );
        self.hash_field(
            "display_name",
            options.display_name().unwrap_or_default().as_bytes(),
        );
        self.hash_field("deep", if options.deep { b"true" } else { b"false" });
        self.hash_field(
            "icon",
            if options.icon_path().is_some() {
                b"present"
            } else {
                b"absent"
            },
        );
    }

    /// Generate the final fingerprint
    pub fn finalize(self) -> Fingerprint {
        Fingerprint::from_bytes(self.hasher.finalize().into())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the fingerprint of a request.
///
/// Covers the input bytes, the canonical option encoding, and the icon
/// bytes when an icon is supplied. The icon's path is deliberately not part
/// of the digest.
pub fn fingerprint_request(request: &ProcessingRequest) -> Result<Fingerprint> {
    Ok(fingerprint_with_manifest(request)?.0)
}

/// Like [`fingerprint_request`], also returning what went into the digest
pub fn fingerprint_with_manifest(
    request: &ProcessingRequest,
) -> Result<(Fingerprint, HashManifest)> {
    let mut hasher = ContentHasher::new();
    hasher.hash_file("input", request.input())?;
    hasher.hash_options(request.options());
    if let Some(icon) = request.options().icon_path() {
        hasher.hash_file("icon_bytes", icon)?;
    }
    let manifest = hasher.manifest.clone();
    Ok((hasher.finalize(), manifest))
}

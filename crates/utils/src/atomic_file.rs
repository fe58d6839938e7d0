//! Atomic file operations so readers never observe half-written artifacts

use apkforge_core::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Hidden, unique sibling path for staging writes next to `path`
pub fn temp_sibling(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().ok_or_else(|| {
        Error::configuration(format!("invalid file path '{}': no parent directory", path.display()))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(parent.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple())))
}

/// Write data to a file atomically by writing to a temporary file and renaming
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::configuration("Invalid file path: no parent directory".to_string())
    })?;

    fs::create_dir_all(parent)
        .map_err(|e| Error::storage(parent.to_path_buf(), "create parent directory", e))?;

    let temp_path = temp_sibling(path)?;

    let result = (|| -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::storage(&temp_path, "create temporary file", e))?;

        file.write_all(content)
            .map_err(|e| Error::storage(&temp_path, "write to temporary file", e))?;

        file.sync_all()
            .map_err(|e| Error::storage(&temp_path, "sync temporary file", e))?;

        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    rename_into_place(&temp_path, path)
}

/// Copy `src` to `dst` atomically.
///
/// The bytes land in a temporary sibling of `dst` first, so a concurrent
/// reader of `dst` sees either the previous file or the complete copy.
pub fn copy_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let parent = dst.parent().ok_or_else(|| {
        Error::configuration(format!("invalid destination '{}': no parent directory", dst.display()))
    })?;
    fs::create_dir_all(parent)
        .map_err(|e| Error::storage(parent.to_path_buf(), "create destination directory", e))?;

    let temp_path = temp_sibling(dst)?;

    let result = (|| -> Result<u64> {
        let mut input = File::open(src).map_err(|e| Error::storage(src, "open copy source", e))?;
        let mut output = File::create(&temp_path)
            .map_err(|e| Error::storage(&temp_path, "create temporary file", e))?;
        let copied = io::copy(&mut input, &mut output)
            .map_err(|e| Error::storage(&temp_path, "copy into temporary file", e))?;
        output
            .sync_all()
            .map_err(|e| Error::storage(&temp_path, "sync temporary file", e))?;
        Ok(copied)
    })();

    match result {
        Ok(copied) => {
            rename_into_place(&temp_path, dst)?;
            Ok(copied)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

fn rename_into_place(temp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(temp_path, path).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        Error::storage(path.to_path_buf(), "atomic rename", e)
    })
}

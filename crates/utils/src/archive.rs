//! Secure archive extraction.
//!
//! Both tar.gz and zip archives are unpacked entry by entry. Every entry's
//! target is resolved lexically against the extraction root and must stay
//! strictly inside it:
//! - entries with `..` segments that climb out of the root are skipped
//! - entries with absolute names are skipped
//! - symlinks, hard links and special files are never materialized
//!
//! A skipped entry is not an error. Any I/O failure on the archive or on a
//! target file aborts the whole extraction.

use apkforge_core::{Error, Result};
use flate2::read::GzDecoder;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tar::Archive;

/// Supported archive containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tarball
    TarGz,
    /// zip archive
    Zip,
}

impl ArchiveFormat {
    /// Guess the format from a file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Format runtime distributions ship in on the current platform
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Zip
        } else {
            Self::TarGz
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => f.write_str("tar-gz"),
            Self::Zip => f.write_str("zip"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tar-gz" | "tar.gz" | "tgz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            other => Err(Error::configuration(format!(
                "unknown archive format '{other}' (expected tar-gz or zip)"
            ))),
        }
    }
}

/// Summary of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Regular files written
    pub files: usize,
    /// Directories created from directory entries
    pub directories: usize,
    /// Entry names rejected because they escape the root
    pub skipped: Vec<String>,
    /// Links and special entries that were not materialized
    pub ignored: usize,
}

impl ExtractionReport {
    fn reject(&mut self, root: &Path, entry: &str) {
        let rejection = Error::traversal_rejected(entry);
        tracing::warn!(
            entry = %entry,
            root = %root.display(),
            "{rejection}, skipped"
        );
        self.skipped.push(entry.to_string());
    }
}

/// Where an entry lands relative to the extraction root
#[derive(Debug, PartialEq, Eq)]
enum EntryTarget {
    Inside(PathBuf),
    Root,
    Outside,
}

/// Extract `archive` into `root` using the given container format.
///
/// Creates `root` if needed.
pub fn extract(archive: &Path, root: &Path, format: ArchiveFormat) -> Result<ExtractionReport> {
    let root = &std::path::absolute(root).map_err(|e| {
        Error::extraction_with_source(archive, format!("resolve root {}", root.display()), e)
    })?;
    fs::create_dir_all(root).map_err(|e| {
        Error::extraction_with_source(archive, format!("create root {}", root.display()), e)
    })?;

    let report = match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, root)?,
        ArchiveFormat::Zip => extract_zip(archive, root)?,
    };

    tracing::debug!(
        archive = %archive.display(),
        root = %root.display(),
        files = report.files,
        directories = report.directories,
        skipped = report.skipped.len(),
        "archive extracted"
    );
    Ok(report)
}

/// Extract a tar.gz archive into an existing root
pub fn extract_tar_gz(archive_path: &Path, root: &Path) -> Result<ExtractionReport> {
    let file = File::open(archive_path)
        .map_err(|e| Error::extraction_with_source(archive_path, "open archive", e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut report = ExtractionReport::default();

    let entries = archive
        .entries()
        .map_err(|e| Error::extraction_with_source(archive_path, "read entries", e))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::extraction_with_source(archive_path, "read entry", e))?;
        let name = entry
            .path()
            .map_err(|e| Error::extraction_with_source(archive_path, "decode entry path", e))?
            .into_owned();
        let label = name.to_string_lossy().into_owned();

        let target = match resolve_entry(root, &name) {
            EntryTarget::Inside(target) => target,
            EntryTarget::Root => continue,
            EntryTarget::Outside => {
                report.reject(root, &label);
                continue;
            }
        };

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            create_dir(archive_path, &target)?;
            report.directories += 1;
        } else if kind.is_file() {
            let mode = entry.header().mode().ok();
            write_entry(archive_path, &target, &mut entry, mode)?;
            report.files += 1;
        } else {
            tracing::debug!(entry = %label, kind = ?kind, "ignoring non-regular tar entry");
            report.ignored += 1;
        }
    }

    Ok(report)
}

/// Extract a zip archive into an existing root
pub fn extract_zip(archive_path: &Path, root: &Path) -> Result<ExtractionReport> {
    let file = File::open(archive_path)
        .map_err(|e| Error::extraction_with_source(archive_path, "open archive", e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction_with_source(archive_path, "read zip directory", e))?;
    let mut report = ExtractionReport::default();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::extraction_with_source(archive_path, "open entry", e))?;
        let label = entry.name().to_string();

        let target = match resolve_entry(root, Path::new(&label)) {
            EntryTarget::Inside(target) => target,
            EntryTarget::Root => continue,
            EntryTarget::Outside => {
                report.reject(root, &label);
                continue;
            }
        };

        if entry.is_dir() {
            create_dir(archive_path, &target)?;
            report.directories += 1;
        } else if entry.is_file() {
            let mode = entry.unix_mode();
            write_entry(archive_path, &target, &mut entry, mode)?;
            report.files += 1;
        } else {
            tracing::debug!(entry = %label, "ignoring non-regular zip entry");
            report.ignored += 1;
        }
    }

    Ok(report)
}

fn create_dir(archive: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target).map_err(|e| {
        Error::extraction_with_source(archive, format!("create directory {}", target.display()), e)
    })
}

fn write_entry(
    archive: &Path,
    target: &Path,
    reader: &mut impl Read,
    mode: Option<u32>,
) -> Result<()> {
    if let Some(parent) = target.parent() {
        create_dir(archive, parent)?;
    }

    let mut out = File::create(target).map_err(|e| {
        Error::extraction_with_source(archive, format!("create {}", target.display()), e)
    })?;
    io::copy(reader, &mut out).map_err(|e| {
        Error::extraction_with_source(archive, format!("write {}", target.display()), e)
    })?;

    apply_mode(archive, target, mode)
}

#[cfg(unix)]
fn apply_mode(archive: &Path, target: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode.map(|m| m & 0o7777).filter(|m| *m != 0) else {
        return Ok(());
    };
    fs::set_permissions(target, fs::Permissions::from_mode(mode)).map_err(|e| {
        Error::extraction_with_source(archive, format!("chmod {}", target.display()), e)
    })
}

#[cfg(not(unix))]
fn apply_mode(_archive: &Path, _target: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

fn resolve_entry(root: &Path, entry: &Path) -> EntryTarget {
    if entry.has_root()
        || entry
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return EntryTarget::Outside;
    }

    // Decided on the entry alone so the shape of `root` cannot matter
    let relative = normalize_lexically(entry);
    match relative.components().next() {
        None => EntryTarget::Root,
        Some(Component::Normal(_)) => EntryTarget::Inside(root.join(relative)),
        Some(_) => EntryTarget::Outside,
    }
}

/// Collapse `.` and `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when `entry` joined to `root` stays strictly inside `root`
pub fn is_contained(root: &Path, entry: &Path) -> bool {
    matches!(resolve_entry(root, entry), EntryTarget::Inside(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    /// Append an entry with a raw, unvalidated name
    fn append_raw<W: Write>(
        builder: &mut tar::Builder<W>,
        name: &str,
        kind: tar::EntryType,
        mode: u32,
        data: &[u8],
    ) {
        let mut header = tar::Header::new_old();
        {
            let raw = &mut header.as_old_mut().name;
            raw[..name.len()].copy_from_slice(name.as_bytes());
        }
        header.set_entry_type(kind);
        header.set_mode(mode);
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    fn build_tar_gz(path: &Path, entries: &[(&str, tar::EntryType, u32, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, kind, mode, data) in entries {
            append_raw(&mut builder, name, *kind, *mode, data);
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn build_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        for (name, data) in entries {
            match data {
                Some(bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                None => {
                    writer.add_directory(*name, options).unwrap();
                }
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexically(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_containment() {
        let root = Path::new("/srv/jre");
        assert!(is_contained(root, Path::new("bin/java")));
        assert!(is_contained(root, Path::new("bin/../lib/rt.jar")));
        assert!(!is_contained(root, Path::new("../evil")));
        assert!(!is_contained(root, Path::new("bin/../../evil")));
        assert!(!is_contained(root, Path::new("/etc/passwd")));
        assert!(!is_contained(root, Path::new(".")));
        // Sibling with a shared prefix is not inside
        assert!(!is_contained(root, Path::new("../jre-other/x")));
    }

    #[test]
    fn test_containment_with_relative_roots() {
        for root in [".", "", "sub/..", "../up"] {
            let root = Path::new(root);
            assert!(!is_contained(root, Path::new("../x")), "root {root:?}");
            assert!(!is_contained(root, Path::new("a/../../x")), "root {root:?}");
            assert!(is_contained(root, Path::new("a/../x")), "root {root:?}");
        }
        assert_eq!(
            resolve_entry(Path::new("."), Path::new("./bin/java")),
            EntryTarget::Inside(PathBuf::from("./bin/java"))
        );
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("jre.tar.gz")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("x.TGZ")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("ApkRenamer.zip")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_path(Path::new("blob.archive")), None);
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn test_tar_gz_extracts_files_and_dirs() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jre.tar.gz");
        build_tar_gz(
            &archive,
            &[
                ("./", tar::EntryType::Directory, 0o755, b""),
                ("jre/bin/java", tar::EntryType::Regular, 0o755, b"#!/bin/sh\n"),
                ("jre/lib/", tar::EntryType::Directory, 0o755, b""),
                ("jre/lib/modules", tar::EntryType::Regular, 0o644, b"modules"),
            ],
        );

        let root = temp.path().join("out");
        let report = extract(&archive, &root, ArchiveFormat::TarGz).unwrap();

        assert_eq!(report.files, 2);
        assert_eq!(report.directories, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(
            fs::read_to_string(root.join("jre/lib/modules")).unwrap(),
            "modules"
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(root.join("jre/bin/java"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_tar_gz_skips_traversal_entries() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let absolute = outside.join("abs.txt");
        let absolute_name = absolute.to_string_lossy().into_owned();

        let archive = temp.path().join("evil.tar.gz");
        build_tar_gz(
            &archive,
            &[
                ("../escape.txt", tar::EntryType::Regular, 0o644, b"nope"),
                ("good/../../escape2.txt", tar::EntryType::Regular, 0o644, b"nope"),
                (&absolute_name, tar::EntryType::Regular, 0o644, b"nope"),
                ("good/file.txt", tar::EntryType::Regular, 0o644, b"yes"),
            ],
        );

        let root = temp.path().join("root");
        let report = extract(&archive, &root, ArchiveFormat::TarGz).unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(fs::read_to_string(root.join("good/file.txt")).unwrap(), "yes");
        assert!(!temp.path().join("escape.txt").exists());
        assert!(!temp.path().join("escape2.txt").exists());
        assert!(!absolute.exists());
    }

    #[test]
    fn test_tar_gz_ignores_symlinks() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.gz");
        build_tar_gz(
            &archive,
            &[
                ("link", tar::EntryType::Symlink, 0o777, b""),
                ("file", tar::EntryType::Regular, 0o644, b"data"),
            ],
        );

        let root = temp.path().join("root");
        let report = extract(&archive, &root, ArchiveFormat::TarGz).unwrap();
        assert_eq!(report.ignored, 1);
        assert_eq!(report.files, 1);
        assert!(fs::symlink_metadata(root.join("link")).is_err());
    }

    #[test]
    fn test_zip_extracts_and_skips_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ApkRenamer.zip");
        build_zip(
            &archive,
            &[
                ("ApkRenamer/renamer.jar", Some(b"jar-bytes")),
                ("ApkRenamer/lib/", None),
                ("../zip-escape.txt", Some(b"nope")),
                ("/zip-absolute.txt", Some(b"nope")),
            ],
        );

        let root = temp.path().join("lib");
        let report = extract(&archive, &root, ArchiveFormat::Zip).unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.directories, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(
            fs::read(root.join("ApkRenamer/renamer.jar")).unwrap(),
            b"jar-bytes"
        );
        assert!(root.join("ApkRenamer/lib").is_dir());
        assert!(!temp.path().join("zip-escape.txt").exists());
    }

    #[test]
    fn test_file_before_directory_entry() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("order.zip");
        build_zip(
            &archive,
            &[("a/b/c.txt", Some(b"deep")), ("a/", None), ("a/b/", None)],
        );

        let root = temp.path().join("root");
        let report = extract(&archive, &root, ArchiveFormat::Zip).unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(fs::read_to_string(root.join("a/b/c.txt")).unwrap(), "deep");
    }

    #[test]
    fn test_missing_archive_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = extract(
            &temp.path().join("missing.tar.gz"),
            &temp.path().join("root"),
            ArchiveFormat::TarGz,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }

    #[test]
    fn test_corrupt_zip_is_fatal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();
        let err = extract(&archive, &temp.path().join("root"), ArchiveFormat::Zip).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed { .. }));
    }
}

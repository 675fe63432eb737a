use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::BACKUP_DIR;
use crate::error::{Error, Result};
use crate::task::CancellationToken;

const DICOM_EXTENSIONS: [&str; 3] = ["dcm", "dicom", "dic"];
const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Collects candidate DICOM files below `root`, sorted by path.
///
/// Backup folders are never descended into.
pub fn discover(root: &Path, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter();
    for entry in walker.filter_entry(|entry| !is_backup_dir(entry)) {
        cancel.check()?;
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(root).to_path_buf();
            Error::io(path, err.into())
        })?;
        if entry.file_type().is_file() && is_dicom_candidate(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    log::info!("Found {} DICOM file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// Known extension, or no extension and the `DICM` marker after the preamble.
pub fn is_dicom_candidate(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => DICOM_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => has_dicom_magic(path),
    }
}

fn has_dicom_magic(path: &Path) -> bool {
    let mut header = [0u8; PREAMBLE_LEN + 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut header))
        .map(|()| &header[PREAMBLE_LEN..] == MAGIC)
        .unwrap_or(false)
}

fn is_backup_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == BACKUP_DIR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_sample_file;
    use std::fs;

    #[test]
    fn finds_files_by_extension_and_magic() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("series");
        fs::create_dir(&nested).unwrap();

        write_sample_file(dir.path(), "a.dcm", "P1");
        write_sample_file(&nested, "b.DICOM", "P2");
        write_sample_file(&nested, "IM0001", "P3");
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("README"), "no magic here").unwrap();

        let found = discover(dir.path(), &CancellationToken::new()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.dcm", "IM0001", "b.DICOM"]);
    }

    #[test]
    fn skips_backup_folders() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join(BACKUP_DIR);
        fs::create_dir(&backups).unwrap();
        write_sample_file(dir.path(), "a.dcm", "P1");
        write_sample_file(&backups, "a_20240101_120000_000.dcm", "P1");

        let found = discover(dir.path(), &CancellationToken::new()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn cancelled_walk_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_file(dir.path(), "a.dcm", "P1");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(discover(dir.path(), &cancel), Err(Error::Cancelled)));
    }
}

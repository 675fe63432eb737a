use chrono::Local;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Sibling folder that holds timestamped copies of overwritten files.
pub const BACKUP_DIR: &str = ".dicom_backup";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Copies `path` into its backup folder as
/// `<stem>_<YYYYMMDD_HHMMSS_fff>.<ext>` and prunes older copies so at most
/// `max_versions` remain (at least the one just made).
pub fn create_backup(path: &Path, max_versions: usize) -> Result<PathBuf> {
    let dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(BACKUP_DIR);
    fs::create_dir_all(&dir).map_err(|err| Error::io(&dir, err))?;

    let (stem, ext) = split_name(path);
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    let name = match &ext {
        Some(ext) => format!("{stem}_{timestamp}.{ext}"),
        None => format!("{stem}_{timestamp}"),
    };
    let target = dir.join(name);
    fs::copy(path, &target).map_err(|err| Error::io(path, err))?;
    log::debug!("Backed up {} to {}", path.display(), target.display());

    prune_backups(&dir, &stem, ext.as_deref(), max_versions.max(1))?;
    Ok(target)
}

/// Deletes the oldest backups of one file beyond `keep`. Returns how many
/// were removed.
pub fn prune_backups(dir: &Path, stem: &str, ext: Option<&str>, keep: usize) -> Result<usize> {
    let pattern = match ext {
        Some(ext) => format!(
            r"^{}_[0-9]{{8}}_[0-9]{{6}}_[0-9]{{3}}\.{}$",
            regex::escape(stem),
            regex::escape(ext)
        ),
        None => format!(r"^{}_[0-9]{{8}}_[0-9]{{6}}_[0-9]{{3}}$", regex::escape(stem)),
    };
    let matcher = Regex::new(&pattern).map_err(|err| {
        Error::io(dir, std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
    })?;

    let mut backups: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|err| Error::io(dir, err))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| matcher.is_match(name))
        })
        .collect();
    // timestamps sort lexicographically, newest last
    backups.sort();

    let excess = backups.len().saturating_sub(keep);
    for old in &backups[..excess] {
        fs::remove_file(old).map_err(|err| Error::io(old, err))?;
        log::debug!("Removed old backup {}", old.display());
    }
    Ok(excess)
}

fn split_name(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());
    (stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_lands_in_sibling_folder() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.dcm");
        fs::write(&file, b"original").unwrap();

        let backup = create_backup(&file, 5).unwrap();
        assert_eq!(backup.parent().unwrap(), dir.path().join(BACKUP_DIR));
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("scan_"));
        assert!(name.ends_with(".dcm"));
        assert_eq!(fs::read(&backup).unwrap(), b"original");
    }

    #[test]
    fn prune_keeps_newest_versions_of_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        for second in 0..4 {
            let name = format!("scan_20240101_12000{second}_000.dcm");
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::write(dir.path().join("scan_x_20240101_120000_000.dcm"), b"x").unwrap();
        fs::write(dir.path().join("other_20240101_120000_000.dcm"), b"x").unwrap();

        let removed = prune_backups(dir.path(), "scan", Some("dcm"), 2).unwrap();
        assert_eq!(removed, 2);
        assert!(!dir.path().join("scan_20240101_120001_000.dcm").exists());
        assert!(dir.path().join("scan_20240101_120002_000.dcm").exists());
        assert!(dir.path().join("scan_20240101_120003_000.dcm").exists());
        assert!(dir.path().join("scan_x_20240101_120000_000.dcm").exists());
        assert!(dir.path().join("other_20240101_120000_000.dcm").exists());
    }

    #[test]
    fn extensionless_files_are_backed_up_without_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("IM0001");
        fs::write(&file, b"data").unwrap();
        let backup = create_backup(&file, 1).unwrap();
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(Regex::new(r"^IM0001_[0-9]{8}_[0-9]{6}_[0-9]{3}$")
            .unwrap()
            .is_match(name));
    }
}

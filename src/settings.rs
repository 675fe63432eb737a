use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Error, Result};

/// User preferences that shape loading, display and saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub create_backup_before_save: bool,
    pub max_backup_versions: usize,
    pub show_private_tags: bool,
    pub validate_while_typing: bool,
    pub max_concurrent_loads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            create_backup_before_save: true,
            max_backup_versions: 5,
            show_private_tags: true,
            validate_while_typing: true,
            max_concurrent_loads: 10,
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file. A missing file yields the defaults;
    /// keys absent from the file keep their default values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let file = File::open(path).map_err(|err| Error::io(path, err))?;
        let settings: Settings = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| Error::Settings(format!("{}: {err}", path.display())))?;
        settings.validate()?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let file = File::create(path).map_err(|err| Error::io(path, err))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|err| Error::Settings(format!("{}: {err}", path.display())))?;
        log::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_loads == 0 {
            return Err(Error::Settings(
                "max_concurrent_loads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.create_backup_before_save);
        assert_eq!(settings.max_backup_versions, 5);
        assert!(settings.show_private_tags);
        assert!(settings.validate_while_typing);
        assert_eq!(settings.max_concurrent_loads, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            show_private_tags: false,
            max_concurrent_loads: 2,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "max_backup_versions": 2 }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.max_backup_versions, 2);
        assert_eq!(settings.max_concurrent_loads, 10);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "max_concurrent_loads": 0 }"#).unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Settings(_))));
    }

    #[test]
    fn malformed_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Settings(_))));
    }
}

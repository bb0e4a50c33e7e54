use directories::ProjectDirs;
use doc_model::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: u32 = 1;
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported settings version {found} (expected {SETTINGS_SCHEMA_VERSION})")]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    settings: Settings,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Pagemark", "Pagemark")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Stored settings, or defaults when nothing was saved yet.
    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        load_settings_file(&path)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        save_settings_file(&self.settings_path(), settings)
    }
}

/// Read a settings envelope from an explicit path.
pub fn load_settings_file(path: &Path) -> Result<Settings, StorageError> {
    let bytes = fs::read(path)?;
    let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)?;

    if envelope.version != SETTINGS_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion { found: envelope.version });
    }

    Ok(envelope.settings.sanitized())
}

pub fn save_settings_file(path: &Path, settings: &Settings) -> Result<(), StorageError> {
    let envelope =
        SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: settings.clone() };

    let bytes = serde_json::to_vec_pretty(&envelope)?;
    fs::write(path, bytes)?;
    log::debug!("saved settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Color, MarkerStyle};

    #[test]
    fn settings_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path().join("nested"));

        let settings = Settings {
            marker: MarkerStyle { color: Color::rgb(200, 0, 0), width: 6.0 },
            render_scale: 1.5,
            clip_to_page: false,
            ..Settings::default()
        };

        store.save_settings(&settings).expect("save should succeed");
        let loaded = store.load_settings().expect("load should succeed");

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_settings().expect("load should succeed");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_settings_are_filled_and_sanitized() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("custom.json");
        fs::write(&path, r#"{ "version": 1, "settings": { "bitmap_cache_pages": 0 } }"#)
            .expect("write should succeed");

        let loaded = load_settings_file(&path).expect("load should succeed");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("future.json");
        fs::write(&path, r#"{ "version": 7, "settings": {} }"#).expect("write should succeed");

        let err = load_settings_file(&path).expect_err("version 7 is unknown");
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 7 }));
    }

    #[test]
    fn malformed_file_is_a_serde_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write should succeed");

        assert!(matches!(load_settings_file(&path), Err(StorageError::Serde(_))));
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::calibration::REQUIRED_CLICKS;
use crate::gaze::LOGGING_INTERVAL_MS;

const API_URL_ENV: &str = "HAZARDLENS_API_URL";
const DEBUG_ENV: &str = "HAZARDLENS_DEBUG";
const DEBUG_FLUSH_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub logging_interval_ms: i64,
    pub calibration_clicks: u32,
    pub outbox_flush_interval_secs: u64,
    pub outbox_max_attempts: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".into(),
            request_timeout_secs: 30,
            logging_interval_ms: LOGGING_INTERVAL_MS,
            calibration_clicks: REQUIRED_CLICKS,
            outbox_flush_interval_secs: 60,
            outbox_max_attempts: 10,
        }
    }
}

impl CaptureSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn outbox_flush_interval(&self) -> Duration {
        Duration::from_secs(self.outbox_flush_interval_secs.max(1))
    }

    /// Applies `HAZARDLENS_API_URL` and `HAZARDLENS_DEBUG` on top of the
    /// stored values. Overrides are never written back to disk.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }

        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.outbox_flush_interval_secs = DEBUG_FLUSH_INTERVAL_SECS;
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CaptureSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, writing defaults there when the file is
    /// missing. Unparseable files fall back to defaults without being
    /// overwritten.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                CaptureSettings::default()
            })
        } else {
            let defaults = CaptureSettings::default();
            persist(&path, &defaults)?;
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> CaptureSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = self.write();
        persist(&self.path, &settings)?;
        *guard = settings;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, CaptureSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, CaptureSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn persist(path: &Path, data: &CaptureSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        assert_eq!(store.current(), CaptureSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn update_round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut changed = store.current();
        changed.api_base_url = "https://survey.example".into();
        changed.calibration_clicks = 3;
        store.update(changed.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.current(), changed);
    }

    #[test]
    fn partial_and_corrupt_files_fall_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{ "requestTimeoutSecs": 5 }"#).unwrap();
        let store = SettingsStore::new(partial).unwrap();
        assert_eq!(store.current().request_timeout_secs, 5);
        assert_eq!(store.current().logging_interval_ms, LOGGING_INTERVAL_MS);

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "not json").unwrap();
        assert_eq!(
            SettingsStore::new(corrupt).unwrap().current(),
            CaptureSettings::default()
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqstudio_app_core::ports::SettingsRepo;
use reqstudio_app_core::AppSettings;
use tracing::debug;

use crate::fs_util::atomic_write;

const QUALIFIER: &str = "com";
const ORG: &str = "reqstudio";
const APP: &str = "ReqStudio";
const SETTINGS_FILE: &str = "settings.json";

/// Application settings stored as JSON in the platform config directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORG, APP)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self::with_dir(proj_dirs.config_dir()))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }
}

impl SettingsRepo for SettingsStore {
    fn load(&self) -> Result<AppSettings> {
        let path = self.path();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(AppSettings::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read settings")?;
        let settings: AppSettings =
            serde_json::from_str(&content).context("Failed to parse settings")?;
        Ok(settings)
    }

    fn save(&self, settings: &AppSettings) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to create config directory {}", self.dir.display())
            })?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        atomic_write(&self.path(), json.as_bytes()).context("Failed to write settings")?;
        Ok(())
    }
}

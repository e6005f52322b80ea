use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::navigation::Section;

fn default_last_section() -> String {
    reqstudio_config::DEFAULT_SECTION.to_string()
}

fn default_analysis_timeout() -> u64 {
    reqstudio_config::DEFAULT_ANALYSIS_TIMEOUT_SECS
}

fn default_generation_timeout() -> u64 {
    reqstudio_config::DEFAULT_GENERATION_TIMEOUT_SECS
}

fn default_llm_base_url() -> String {
    reqstudio_config::DEFAULT_LLM_BASE_URL.to_string()
}

fn default_llm_model() -> String {
    reqstudio_config::DEFAULT_LLM_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Free-form; resolved through [`Section::parse`] when read.
    #[serde(default = "default_last_section")]
    pub last_section: String,
    #[serde(default)]
    pub recent_workspaces: Vec<Utf8PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            analysis_timeout_secs: default_analysis_timeout(),
            generation_timeout_secs: default_generation_timeout(),
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            last_section: default_last_section(),
            recent_workspaces: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn last_section(&self) -> Section {
        Section::parse(&self.last_section)
    }

    pub fn set_last_section(&mut self, section: Section) {
        self.last_section = section.as_str().to_string();
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(reqstudio_config::clamp_timeout_secs(self.analysis_timeout_secs))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(reqstudio_config::clamp_timeout_secs(
            self.generation_timeout_secs,
        ))
    }

    /// Moves `path` to the front of the recent list, dropping duplicates and
    /// the oldest entries beyond the limit.
    pub fn record_recent(&mut self, path: Utf8PathBuf) {
        self.recent_workspaces.retain(|p| *p != path);
        self.recent_workspaces.insert(0, path);
        self.recent_workspaces
            .truncate(reqstudio_config::RECENT_WORKSPACES);
    }
}

pub mod commands;

use std::path::Path;

use anyhow::Result;
use reqstudio_app_core::ports::SettingsRepo;
use reqstudio_app_core::{AppKernel, AppSettings, KernelBuilder};
use reqstudio_infra::{OllamaClient, OllamaConfig};
use reqstudio_persistence::{JsonRequirementImporter, JsonWorkspaceStore, SettingsStore};

/// Where settings live and which analysis service to talk to.
#[derive(Debug, Clone)]
pub struct CliEnv {
    pub settings: SettingsStore,
    pub llm_url: Option<String>,
    pub model: Option<String>,
}

impl CliEnv {
    pub fn new(llm_url: Option<String>, model: Option<String>) -> Result<Self> {
        Ok(Self {
            settings: SettingsStore::new()?,
            llm_url,
            model,
        })
    }

    pub fn with_settings_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            settings: SettingsStore::with_dir(dir),
            llm_url: None,
            model: None,
        }
    }

    fn llm_config(&self, settings: &AppSettings) -> OllamaConfig {
        let mut config = OllamaConfig::from(settings);
        if let Some(url) = &self.llm_url {
            config.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        config
    }

    /// Wires the kernel to the file and network adapters. Must be called from
    /// within a tokio runtime.
    pub fn build_kernel(&self) -> Result<AppKernel> {
        let settings = self.settings.load().unwrap_or_default();
        let analysis = OllamaClient::new(self.llm_config(&settings))?;
        let kernel = KernelBuilder::new()
            .persistence(JsonWorkspaceStore::new())
            .importer(JsonRequirementImporter::new())
            .analysis(analysis)
            .settings(self.settings.clone())
            .build()?;
        Ok(kernel)
    }
}

//! Workspace documents as versioned JSON files.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use reqstudio_app_core::ports::{PersistencePort, PortResult};
use reqstudio_config::WORKSPACE_FORMAT_VERSION;
use reqstudio_core::Workspace;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::fs_util::atomic_write;

fn legacy_format_version() -> u32 {
    1
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    #[serde(flatten)]
    workspace: &'a Workspace,
}

#[derive(Deserialize)]
struct Probe {
    #[serde(default = "legacy_format_version")]
    format_version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(flatten)]
    workspace: Workspace,
}

pub fn encode(workspace: &Workspace) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(&EnvelopeRef {
        format_version: WORKSPACE_FORMAT_VERSION,
        workspace,
    })
}

/// Decodes a document read from `path`. Rejects newer formats and documents
/// with duplicate or blank requirement identifiers.
pub fn decode(path: &Utf8Path, bytes: &[u8]) -> Result<Workspace, StoreError> {
    let serde_err = |source: serde_json::Error| StoreError::Serde {
        path: path.to_path_buf(),
        source,
    };

    let probe: Probe = serde_json::from_slice(bytes).map_err(serde_err)?;
    if probe.format_version > WORKSPACE_FORMAT_VERSION {
        return Err(StoreError::NewerFormat {
            path: path.to_path_buf(),
            found: probe.format_version,
            supported: WORKSPACE_FORMAT_VERSION,
        });
    }

    let Envelope { mut workspace } = serde_json::from_slice(bytes).map_err(serde_err)?;
    workspace.validate().map_err(|source| StoreError::Integrity {
        path: path.to_path_buf(),
        source,
    })?;
    workspace.file_path = Some(path.to_path_buf());
    Ok(workspace)
}

#[derive(Debug, Default, Clone)]
pub struct JsonWorkspaceStore;

impl JsonWorkspaceStore {
    pub fn new() -> Self {
        Self
    }

    async fn write(&self, path: Utf8PathBuf, bytes: Vec<u8>) -> Result<(), StoreError> {
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = task_path.parent().filter(|p| !p.as_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            atomic_write(task_path.as_std_path(), &bytes).map_err(|e| StoreError::io(&task_path, e))
        })
        .await
        .map_err(|e| StoreError::Task {
            path,
            message: e.to_string(),
        })?
    }

    async fn read(&self, path: Utf8PathBuf) -> Result<Workspace, StoreError> {
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&task_path).map_err(|e| StoreError::io(&task_path, e))?;
            decode(&task_path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Task {
            path,
            message: e.to_string(),
        })?
    }
}

#[async_trait]
impl PersistencePort for JsonWorkspaceStore {
    async fn save(&self, path: &Utf8Path, workspace: &Workspace) -> PortResult<()> {
        let bytes = encode(workspace).map_err(|source| StoreError::Serde {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(%path, bytes = bytes.len(), "writing workspace");
        self.write(path.to_path_buf(), bytes).await?;
        info!(%path, requirements = workspace.requirements.len(), "workspace saved");
        Ok(())
    }

    async fn load(&self, path: &Utf8Path) -> PortResult<Workspace> {
        let workspace = self.read(path.to_path_buf()).await?;
        info!(%path, requirements = workspace.requirements.len(), "workspace loaded");
        Ok(workspace)
    }
}

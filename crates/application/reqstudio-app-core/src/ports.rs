//! Collaborator ports. Implementations live in the infrastructure crates; the
//! kernel calls them from background tasks, so they must be `Send + Sync`.

use async_trait::async_trait;
use camino::Utf8Path;
use reqstudio_core::{AnalysisResult, Requirement, TestCase, Workspace};
use thiserror::Error;

use crate::domain::AppSettings;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("i/o failure on {path}: {message}")]
    Io { path: String, message: String },
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("could not parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("unsupported import format: {0}")]
    UnsupportedFormat(String),
    #[error("file is in use by another program: {0}")]
    SharingViolation(String),
    #[error("import failed: {0}")]
    Import(String),
    #[error("analysis service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("analysis service timed out after {0}s")]
    Timeout(u64),
    #[error("operation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected condition with an actionable message for the user.
    Transient,
    /// Anything else: generic message, logged at error level.
    Unexpected,
    /// The user abandoned the operation; nothing to report.
    Cancelled,
}

/// Which user operation a failure belongs to; drives the notification text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Load,
    Import,
    Analyze,
    Generate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Load => "open",
            Operation::Import => "import",
            Operation::Analyze => "analysis",
            Operation::Generate => "test case generation",
        }
    }
}

impl PortError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PortError::NotFound(_)
            | PortError::UnsupportedFormat(_)
            | PortError::SharingViolation(_)
            | PortError::ServiceUnavailable(_)
            | PortError::Timeout(_) => FailureKind::Transient,
            PortError::Cancelled => FailureKind::Cancelled,
            PortError::Io { .. } | PortError::Parse { .. } | PortError::Import(_) => {
                FailureKind::Unexpected
            }
        }
    }

    /// Message shown in the notification area.
    pub fn user_message(&self, op: Operation) -> String {
        match self {
            PortError::NotFound(path) => format!("Could not {}: {path} does not exist.", op.as_str()),
            PortError::UnsupportedFormat(path) => {
                format!("{path} is not a supported import format. Use a JSON requirements export.")
            }
            PortError::SharingViolation(path) => {
                format!("{path} is open in another program. Close it and try again.")
            }
            PortError::ServiceUnavailable(_) => {
                "The analysis service is not reachable. Check that it is running and try again."
                    .to_string()
            }
            PortError::Timeout(secs) => format!(
                "The {} took longer than {secs}s and was stopped. Try again or raise the timeout.",
                op.as_str()
            ),
            PortError::Cancelled => format!("The {} was cancelled.", op.as_str()),
            PortError::Io { .. } | PortError::Parse { .. } | PortError::Import(_) => {
                format!("The {} failed unexpectedly. See the log for details.", op.as_str())
            }
        }
    }
}

pub type PortResult<T> = Result<T, PortError>;

#[async_trait]
pub trait PersistencePort: Send + Sync + 'static {
    async fn save(&self, path: &Utf8Path, workspace: &Workspace) -> PortResult<()>;
    async fn load(&self, path: &Utf8Path) -> PortResult<Workspace>;
}

#[async_trait]
pub trait ImportPort: Send + Sync + 'static {
    /// Returns requirements in source order.
    async fn import(&self, path: &Utf8Path) -> PortResult<Vec<Requirement>>;
}

#[async_trait]
pub trait AnalysisPort: Send + Sync + 'static {
    async fn analyze_requirement(&self, text: &str) -> PortResult<AnalysisResult>;
    async fn generate_test_cases(&self, requirements: &[Requirement]) -> PortResult<Vec<TestCase>>;
}

pub trait SettingsRepo: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<AppSettings>;
    fn save(&self, settings: &AppSettings) -> anyhow::Result<()>;
}

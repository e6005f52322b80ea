use camino::{Utf8Path, Utf8PathBuf};
use reqstudio_app_core::ports::PortError;
use reqstudio_core::WorkspaceIntegrityError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} does not exist")]
    Missing(Utf8PathBuf),
    #[error("{0} is locked by another process")]
    Locked(Utf8PathBuf),
    #[error("io error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON for this document: {source}")]
    Serde {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is from a newer version (format_version={found}, supported={supported})")]
    NewerFormat {
        path: Utf8PathBuf,
        found: u32,
        supported: u32,
    },
    #[error("{path} is inconsistent: {source}")]
    Integrity {
        path: Utf8PathBuf,
        #[source]
        source: WorkspaceIntegrityError,
    },
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(Utf8PathBuf),
    #[error("file worker for {path} failed: {message}")]
    Task { path: Utf8PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Missing,
    Busy,
    Io,
    Codec,
    NewerFormat,
    Corrupt,
    Unsupported,
    Task,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Missing(_) => StoreErrorKind::Missing,
            StoreError::Locked(_) => StoreErrorKind::Busy,
            StoreError::Io { .. } => StoreErrorKind::Io,
            StoreError::Serde { .. } => StoreErrorKind::Codec,
            StoreError::NewerFormat { .. } => StoreErrorKind::NewerFormat,
            StoreError::Integrity { .. } => StoreErrorKind::Corrupt,
            StoreError::UnsupportedFormat(_) => StoreErrorKind::Unsupported,
            StoreError::Task { .. } => StoreErrorKind::Task,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            StoreError::Missing(path)
            | StoreError::Locked(path)
            | StoreError::UnsupportedFormat(path)
            | StoreError::Io { path, .. }
            | StoreError::Serde { path, .. }
            | StoreError::NewerFormat { path, .. }
            | StoreError::Integrity { path, .. }
            | StoreError::Task { path, .. } => path,
        }
    }

    /// Classifies an I/O failure on `path`.
    pub(crate) fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
        if cfg!(windows) && matches!(source.raw_os_error(), Some(32 | 33)) {
            return StoreError::Locked(path.to_path_buf());
        }
        match source.kind() {
            std::io::ErrorKind::NotFound => StoreError::Missing(path.to_path_buf()),
            _ => StoreError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Import-side translation: anything that is not a file-level problem is
    /// reported as a generic import failure.
    pub(crate) fn into_import_error(self) -> PortError {
        match self.kind() {
            StoreErrorKind::Codec | StoreErrorKind::Corrupt | StoreErrorKind::NewerFormat => {
                PortError::Import(self.to_string())
            }
            _ => self.into(),
        }
    }
}

impl From<StoreError> for PortError {
    fn from(value: StoreError) -> Self {
        let path = value.path().to_string();
        match value {
            StoreError::Missing(_) => PortError::NotFound(path),
            StoreError::Locked(_) => PortError::SharingViolation(path),
            StoreError::UnsupportedFormat(_) => PortError::UnsupportedFormat(path),
            StoreError::Io { source, .. } => PortError::Io {
                path,
                message: source.to_string(),
            },
            StoreError::Task { message, .. } => PortError::Io { path, message },
            other => PortError::Parse {
                path,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqstudio_app_core::ports::FailureKind;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = StoreError::io(
            camino::Utf8Path::new("/x.json"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.kind(), StoreErrorKind::Missing);
        let port: PortError = err.into();
        assert!(matches!(port, PortError::NotFound(ref p) if p == "/x.json"));
        assert_eq!(port.kind(), FailureKind::Transient);
    }

    #[test]
    fn newer_format_is_a_parse_failure() {
        let err = StoreError::NewerFormat {
            path: "/w.json".into(),
            found: 9,
            supported: 1,
        };
        let port: PortError = err.into();
        assert!(matches!(port, PortError::Parse { .. }));
    }
}

//! File-backed implementations of the persistence, import and settings ports.

mod error;
mod fs_util;
pub mod importer;
pub mod json_store;
pub mod settings;

pub use error::{StoreError, StoreErrorKind};
pub use importer::JsonRequirementImporter;
pub use json_store::JsonWorkspaceStore;
pub use settings::SettingsStore;

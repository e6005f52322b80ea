//! Requirement import from JSON exports.
//!
//! Accepts either a top-level array of records or an object with a
//! `requirements` array. Each record needs an identifier; `name` and
//! `description` are optional and every other field is kept as metadata.

use std::collections::BTreeMap;

use async_trait::async_trait;
use camino::Utf8Path;
use reqstudio_app_core::ports::{ImportPort, PortResult};
use reqstudio_core::Requirement;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::StoreError;

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Records(Vec<ImportRecord>),
    Wrapped { requirements: Vec<ImportRecord> },
}

#[derive(Deserialize)]
struct ImportRecord {
    #[serde(alias = "Item", alias = "id", alias = "documentKey")]
    item: String,
    #[serde(default, alias = "Name", alias = "title")]
    name: String,
    #[serde(default, alias = "Description", alias = "text")]
    description: String,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl From<ImportRecord> for Requirement {
    fn from(record: ImportRecord) -> Self {
        let metadata = record
            .extra
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();
        Requirement {
            metadata,
            ..Requirement::new(record.item.trim(), record.name.trim()).with_description(record.description)
        }
    }
}

pub fn parse_requirements(path: &Utf8Path, bytes: &[u8]) -> Result<Vec<Requirement>, StoreError> {
    let document: ImportDocument =
        serde_json::from_slice(bytes).map_err(|source| StoreError::Serde {
            path: path.to_path_buf(),
            source,
        })?;
    let records = match document {
        ImportDocument::Records(records) => records,
        ImportDocument::Wrapped { requirements } => requirements,
    };
    Ok(records.into_iter().map(Requirement::from).collect())
}

fn is_supported(path: &Utf8Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[derive(Debug, Default, Clone)]
pub struct JsonRequirementImporter;

impl JsonRequirementImporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImportPort for JsonRequirementImporter {
    async fn import(&self, path: &Utf8Path) -> PortResult<Vec<Requirement>> {
        if !is_supported(path) {
            debug!(%path, "rejecting import with unsupported extension");
            return Err(StoreError::UnsupportedFormat(path.to_path_buf()).into());
        }

        let task_path = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&task_path).map_err(|e| StoreError::io(&task_path, e))?;
            parse_requirements(&task_path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Task {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let requirements = parsed.map_err(StoreError::into_import_error)?;
        info!(%path, count = requirements.len(), "requirements read from import");
        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_and_bare_arrays_are_accepted() {
        let bare = parse_requirements(
            Utf8Path::new("a.json"),
            br#"[{"item":"R-1","name":"Login"}]"#,
        )
        .unwrap();
        let wrapped = parse_requirements(
            Utf8Path::new("b.json"),
            br#"{"requirements":[{"Item":"R-1","Name":"Login"}]}"#,
        )
        .unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn extra_fields_become_metadata() {
        let reqs = parse_requirements(
            Utf8Path::new("a.json"),
            br#"[{"id":" R-7 ","title":"Export","priority":2,"owner":"qa","note":null}]"#,
        )
        .unwrap();
        let r = &reqs[0];
        assert_eq!(r.item, "R-7");
        assert_eq!(r.name, "Export");
        assert_eq!(r.metadata.get("priority").map(String::as_str), Some("2"));
        assert_eq!(r.metadata.get("owner").map(String::as_str), Some("qa"));
        assert!(!r.metadata.contains_key("note"));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported(Utf8Path::new("reqs.JSON")));
        assert!(!is_supported(Utf8Path::new("reqs.docx")));
        assert!(!is_supported(Utf8Path::new("reqs")));
    }
}

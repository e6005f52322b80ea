use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod identity;
pub mod merge;

pub use identity::{find_by_item, match_displayed_title};
pub use merge::{merge_imported, MergeReport};

/// Stable identifier of a requirement (the `Item` column of imported documents).
pub type RequirementItem = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub item: RequirementItem,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Free-form key/value pairs carried over from the source document.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Requirement {
    pub fn new(item: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            name: name.into(),
            description: String::new(),
            analysis: None,
            test_cases: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Title as shown by list and header views: `"<item> - <name>"`.
    pub fn display_title(&self) -> String {
        format!("{} - {}", self.item, self.name)
    }

    /// Text handed to the analysis service. Falls back to the name when the
    /// requirement has no description yet.
    pub fn analysis_text(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.name
        } else {
            &self.description
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisIssue {
    pub category: String,
    pub severity: IssueSeverity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// 1..=10, higher is better.
    pub quality_score: u8,
    #[serde(default)]
    pub issues: Vec<AnalysisIssue>,
    #[serde(default)]
    pub suggested_rewrite: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestStep {
    pub action: String,
    pub expected: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub id: String,
    /// Identifier of the requirement this case verifies. Generated cases are
    /// attached by this key, never by position.
    pub requirement_item: RequirementItem,
    pub title: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    pub project_name: String,
    /// Location of the last load/save. Not part of the persisted document.
    #[serde(skip)]
    pub file_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceIntegrityError {
    #[error("requirement identifier '{0}' appears more than once")]
    DuplicateItem(RequirementItem),
    #[error("requirement at position {0} has an empty identifier")]
    EmptyItem(usize),
}

impl Workspace {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            file_path: None,
            requirements: Vec::new(),
            saved_at: None,
        }
    }

    pub fn requirement(&self, item: &str) -> Option<&Requirement> {
        find_by_item(&self.requirements, item).map(|ix| &self.requirements[ix])
    }

    pub fn requirement_mut(&mut self, item: &str) -> Option<&mut Requirement> {
        find_by_item(&self.requirements, item).map(move |ix| &mut self.requirements[ix])
    }

    pub fn contains(&self, item: &str) -> bool {
        find_by_item(&self.requirements, item).is_some()
    }

    /// All generated test cases across the workspace, in requirement order.
    pub fn test_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.requirements.iter().flat_map(|r| r.test_cases.iter())
    }

    pub fn test_case_count(&self) -> usize {
        self.requirements.iter().map(|r| r.test_cases.len()).sum()
    }

    pub fn analyzed_count(&self) -> usize {
        self.requirements
            .iter()
            .filter(|r| r.analysis.is_some())
            .count()
    }

    /// Identifier uniqueness is required for import matching; loaders reject
    /// documents that violate it.
    pub fn validate(&self) -> Result<(), WorkspaceIntegrityError> {
        let mut seen = std::collections::HashSet::new();
        for (ix, r) in self.requirements.iter().enumerate() {
            if r.item.trim().is_empty() {
                return Err(WorkspaceIntegrityError::EmptyItem(ix));
            }
            if !seen.insert(r.item.as_str()) {
                return Err(WorkspaceIntegrityError::DuplicateItem(r.item.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_duplicate_items() {
        let mut ws = Workspace::new("P");
        ws.requirements.push(Requirement::new("R-1", "Alpha"));
        ws.requirements.push(Requirement::new("R-1", "Again"));
        assert_eq!(
            ws.validate(),
            Err(WorkspaceIntegrityError::DuplicateItem("R-1".into()))
        );
    }

    #[test]
    fn validate_rejects_blank_item() {
        let mut ws = Workspace::new("P");
        ws.requirements.push(Requirement::new("R-1", "Alpha"));
        ws.requirements.push(Requirement::new("  ", "Blank"));
        assert_eq!(ws.validate(), Err(WorkspaceIntegrityError::EmptyItem(1)));
    }

    #[test]
    fn analysis_text_falls_back_to_name() {
        let r = Requirement::new("R-1", "The pump shall stop");
        assert_eq!(r.analysis_text(), "The pump shall stop");
        let r = r.with_description("Within 2 s of an overpressure signal");
        assert_eq!(r.analysis_text(), "Within 2 s of an overpressure signal");
    }

    #[test]
    fn file_path_is_not_serialized() {
        let mut ws = Workspace::new("P");
        ws.file_path = Some("/tmp/p.json".into());
        let json = serde_json::to_string(&ws).unwrap();
        assert!(!json.contains("file_path"));
        let back: Workspace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_path, None);
    }
}

//! Prompt construction and lenient decoding of model replies.
//!
//! Local models do not follow a schema reliably: field names drift in case and
//! wording, scores come back out of range, and identifiers go missing. Decoding
//! normalizes all of that into domain types.

use chrono::Utc;
use reqstudio_core::{AnalysisIssue, AnalysisResult, IssueSeverity, Requirement, TestCase, TestStep};
use serde::Deserialize;

pub(crate) fn analysis_prompt(text: &str) -> String {
    format!(
        "You review software requirements for clarity, testability and completeness.\n\
         Respond with JSON only, shaped as:\n\
         {{\"quality_score\": 1-10, \"issues\": [{{\"category\": \"...\", \"severity\": \"low|medium|high\", \
         \"description\": \"...\"}}], \"suggested_rewrite\": \"...\"}}\n\n\
         Requirement:\n{text}\n"
    )
}

pub(crate) fn generation_prompt(requirements: &[Requirement]) -> String {
    let mut prompt = String::from(
        "Write manual test cases for each requirement below.\n\
         Respond with JSON only, shaped as:\n\
         {\"test_cases\": [{\"requirement_item\": \"<item>\", \"title\": \"...\", \
         \"preconditions\": [\"...\"], \"steps\": [{\"action\": \"...\", \"expected\": \"...\"}], \
         \"expected_result\": \"...\"}]}\n\nRequirements:\n",
    );
    for r in requirements {
        prompt.push_str(&format!("- [{}] {}: {}\n", r.item, r.name, r.analysis_text()));
    }
    prompt
}

#[derive(Deserialize)]
struct AnalysisReply {
    #[serde(alias = "QualityScore", alias = "score")]
    quality_score: f64,
    #[serde(default, alias = "Issues")]
    issues: Vec<IssueReply>,
    #[serde(
        default,
        alias = "SuggestedRewrite",
        alias = "ImprovedRequirement",
        alias = "improved_requirement"
    )]
    suggested_rewrite: Option<String>,
}

#[derive(Deserialize)]
struct IssueReply {
    #[serde(default, alias = "Category")]
    category: String,
    #[serde(default, alias = "Severity")]
    severity: String,
    #[serde(default, alias = "Description")]
    description: String,
}

fn severity(raw: &str) -> IssueSeverity {
    match raw.trim().to_ascii_lowercase().as_str() {
        "high" | "critical" | "major" => IssueSeverity::High,
        "low" | "minor" => IssueSeverity::Low,
        _ => IssueSeverity::Medium,
    }
}

pub(crate) fn decode_analysis(reply: &str) -> serde_json::Result<AnalysisResult> {
    let raw: AnalysisReply = serde_json::from_str(reply)?;
    Ok(AnalysisResult {
        quality_score: raw.quality_score.round().clamp(1.0, 10.0) as u8,
        issues: raw
            .issues
            .into_iter()
            .filter(|i| !i.description.trim().is_empty())
            .map(|i| AnalysisIssue {
                severity: severity(&i.severity),
                category: i.category,
                description: i.description,
            })
            .collect(),
        suggested_rewrite: raw
            .suggested_rewrite
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        analyzed_at: Utc::now(),
    })
}

#[derive(Deserialize)]
struct GenerationReply {
    #[serde(alias = "TestCases", alias = "testCases")]
    test_cases: Vec<CaseReply>,
}

#[derive(Deserialize)]
struct CaseReply {
    #[serde(default, alias = "requirement", alias = "RequirementItem")]
    requirement_item: Option<String>,
    #[serde(default, alias = "Title")]
    title: String,
    #[serde(default, alias = "Preconditions")]
    preconditions: Vec<String>,
    #[serde(default, alias = "Steps")]
    steps: Vec<StepReply>,
    #[serde(default, alias = "ExpectedResult")]
    expected_result: String,
}

#[derive(Deserialize)]
struct StepReply {
    #[serde(default, alias = "Action")]
    action: String,
    #[serde(default, alias = "Expected", alias = "expected_result")]
    expected: String,
}

/// Cases without a requirement reference are attributed to the only requested
/// requirement, or dropped when the batch had several.
pub(crate) fn decode_test_cases(
    reply: &str,
    requested: &[Requirement],
) -> serde_json::Result<Vec<TestCase>> {
    let raw: GenerationReply = serde_json::from_str(reply)?;
    let sole = match requested {
        [only] => Some(only.item.as_str()),
        _ => None,
    };

    let mut counters = std::collections::HashMap::<String, usize>::new();
    let cases = raw
        .test_cases
        .into_iter()
        .filter_map(|case| {
            let item = case
                .requirement_item
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .or_else(|| sole.map(str::to_string))?;
            let n = counters.entry(item.clone()).or_insert(0);
            *n += 1;
            Some(TestCase {
                id: format!("TC-{item}-{n:03}"),
                requirement_item: item,
                title: case.title,
                preconditions: case.preconditions,
                steps: case
                    .steps
                    .into_iter()
                    .map(|s| TestStep {
                        action: s.action,
                        expected: s.expected,
                    })
                    .collect(),
                expected_result: case.expected_result,
            })
        })
        .collect();
    Ok(cases)
}

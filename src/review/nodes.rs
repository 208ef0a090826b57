// SPDX-License-Identifier: MIT

use crate::engine::{Node, NodeError, WorkflowState};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Functions reported for every review; the extraction is a fixed sample
pub const SAMPLE_FUNCTIONS: [&str; 4] = [
    "login()",
    "process_payment()",
    "send_email()",
    "calculate_tax()",
];

pub const PAYMENT_ISSUE: &str = "Payment logic mixed with others";
pub const SIZE_ISSUE: &str = "Too many functions in one file";

/// Files with more functions than this get flagged
const MAX_FUNCTIONS_PER_FILE: usize = 3;
/// Score lost per detected issue
const ISSUE_PENALTY: f64 = 15.0;
/// Score gained by a round of suggestions
const SUGGESTION_BONUS: f64 = 20.0;

const SUGGESTIONS: [&str; 2] = [
    "Split payment logic into separate service",
    "Follow Single Responsibility Principle",
];

fn string_items<'a>(state: &'a WorkflowState, field: &str) -> Result<Vec<&'a str>, NodeError> {
    match state.get(field) {
        None => Ok(vec![]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| NodeError::invalid_field(field, "an array of strings"))
            })
            .collect(),
        Some(_) => Err(NodeError::invalid_field(field, "an array of strings")),
    }
}

/// Populates `functions`
pub struct ExtractFunctions;

#[async_trait]
impl Node for ExtractFunctions {
    fn name(&self) -> &str {
        "extract"
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<(), NodeError> {
        state.set("functions", json!(SAMPLE_FUNCTIONS));
        log::info!("Extracted {} functions", SAMPLE_FUNCTIONS.len());
        Ok(())
    }
}

/// Flags design issues in `functions` and lowers `quality_score` for each
pub struct CheckIssues;

#[async_trait]
impl Node for CheckIssues {
    fn name(&self) -> &str {
        "check"
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<(), NodeError> {
        let functions = string_items(state, "functions")?;

        let mut issues = Vec::new();
        if functions.join(" ").contains("process_payment") {
            issues.push(PAYMENT_ISSUE);
        }
        if functions.len() > MAX_FUNCTIONS_PER_FILE {
            issues.push(SIZE_ISSUE);
        }

        let penalty = issues.len() as f64 * ISSUE_PENALTY;
        log::debug!("Found {} issues", issues.len());
        state.set("issues", json!(issues));
        state.add("quality_score", -penalty);
        Ok(())
    }
}

/// Appends suggestions while issues remain and advances `iteration`
pub struct GiveSuggestions;

#[async_trait]
impl Node for GiveSuggestions {
    fn name(&self) -> &str {
        "suggest"
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<(), NodeError> {
        if !string_items(state, "issues")?.is_empty() {
            state.append("suggestions", json!(SUGGESTIONS));
            state.add("quality_score", SUGGESTION_BONUS);
        }
        state.add("iteration", 1.0);
        log::info!(
            "Improved! New score: {}",
            state.get("quality_score").unwrap_or(&Value::Null)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: Value) -> WorkflowState {
        WorkflowState::from_json(value).unwrap()
    }

    #[tokio::test]
    async fn test_extract_sets_functions() {
        let mut s = state(json!({"functions": ["old()"]}));
        ExtractFunctions.execute(&mut s).await.unwrap();
        assert_eq!(s.get_array("functions").unwrap().len(), 4);
        assert_eq!(s.get("functions").unwrap()[1], "process_payment()");
    }

    #[tokio::test]
    async fn test_check_flags_both_issues() {
        let mut s = state(json!({"functions": SAMPLE_FUNCTIONS, "quality_score": 50}));
        CheckIssues.execute(&mut s).await.unwrap();

        assert_eq!(s.get("issues"), Some(&json!([PAYMENT_ISSUE, SIZE_ISSUE])));
        assert_eq!(s.get("quality_score"), Some(&json!(20)));
    }

    #[tokio::test]
    async fn test_check_clean_file() {
        let mut s = state(json!({"functions": ["login()"], "quality_score": 50}));
        CheckIssues.execute(&mut s).await.unwrap();

        assert_eq!(s.get("issues"), Some(&json!([])));
        assert_eq!(s.get("quality_score"), Some(&json!(50)));
    }

    #[tokio::test]
    async fn test_check_rejects_malformed_functions() {
        let mut s = state(json!({"functions": "login()"}));
        let err = CheckIssues.execute(&mut s).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidField { field, .. } if field == "functions"));
    }

    #[tokio::test]
    async fn test_suggest_with_issues() {
        let mut s = state(json!({
            "issues": [PAYMENT_ISSUE],
            "quality_score": 20,
            "suggestions": [],
            "iteration": 0
        }));
        GiveSuggestions.execute(&mut s).await.unwrap();

        assert_eq!(s.get("suggestions"), Some(&json!(SUGGESTIONS)));
        assert_eq!(s.get("quality_score"), Some(&json!(40)));
        assert_eq!(s.get("iteration"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_suggest_without_issues_only_advances() {
        let mut s = state(json!({"issues": [], "quality_score": 70, "iteration": 2}));
        GiveSuggestions.execute(&mut s).await.unwrap();

        assert!(s.get("suggestions").is_none());
        assert_eq!(s.get("quality_score"), Some(&json!(70)));
        assert_eq!(s.get("iteration"), Some(&json!(3)));
    }
}

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerisgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] serde_json::Error),
}

/// One rejected field of a request or report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Schema validation failure carrying every issue found, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {}", summarize(.0))]
pub struct ValidationError(pub Vec<FieldIssue>);

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldIssue::new(field, message)])
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|i| i.field == field)
    }

    /// Field-keyed message lists, the shape returned to HTTP clients as `details`.
    pub fn details(&self) -> serde_json::Value {
        let mut fields: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for issue in &self.0 {
            fields
                .entry(issue.field.as_str())
                .or_default()
                .push(issue.message.as_str());
        }
        serde_json::json!({ "fieldErrors": fields })
    }

    /// Ok when no issues were collected.
    pub fn check(issues: Vec<FieldIssue>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self(issues))
        }
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

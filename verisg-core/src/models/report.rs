use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldIssue, ValidationError};

/// Allowed size of `trustedReferences`.
pub const MIN_REFERENCES: usize = 3;
pub const MAX_REFERENCES: usize = 8;

/// Attached to every report the server produces.
pub const DISCLAIMER: &str = "AI-assisted guidance; verify with official sources.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredibilityRating {
    #[serde(rename = "Likely True")]
    LikelyTrue,
    #[serde(rename = "Unclear")]
    Unclear,
    #[serde(rename = "Likely Misleading")]
    LikelyMisleading,
    #[serde(rename = "Likely False")]
    LikelyFalse,
}

impl CredibilityRating {
    pub const ALL: [CredibilityRating; 4] = [
        CredibilityRating::LikelyTrue,
        CredibilityRating::Unclear,
        CredibilityRating::LikelyMisleading,
        CredibilityRating::LikelyFalse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CredibilityRating::LikelyTrue => "Likely True",
            CredibilityRating::Unclear => "Unclear",
            CredibilityRating::LikelyMisleading => "Likely Misleading",
            CredibilityRating::LikelyFalse => "Likely False",
        }
    }
}

impl fmt::Display for CredibilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredibilityRating {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CredibilityRating::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::single("rating", format!("unknown rating '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedReference {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl TrustedReference {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredibilityReport {
    pub rating: CredibilityRating,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub context: String,
    pub trusted_references: Vec<TrustedReference>,
    pub what_to_do_next: String,
    pub claim_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl CredibilityReport {
    /// Decode and validate an untrusted JSON value (LLM output, stored rows).
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let report: CredibilityReport = serde_json::from_value(value)
            .map_err(|e| ValidationError::single("report", e.to_string()))?;
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            issues.push(FieldIssue::new(
                "confidence",
                format!("must be between 0 and 100, got {}", self.confidence),
            ));
        }

        let n = self.trusted_references.len();
        if !(MIN_REFERENCES..=MAX_REFERENCES).contains(&n) {
            issues.push(FieldIssue::new(
                "trustedReferences",
                format!(
                    "must contain {}-{} entries, got {}",
                    MIN_REFERENCES, MAX_REFERENCES, n
                ),
            ));
        }

        for (i, r) in self.trusted_references.iter().enumerate() {
            if !is_http_url(&r.url) {
                issues.push(FieldIssue::new(
                    format!("trustedReferences.{}.url", i),
                    format!("invalid url '{}'", r.url),
                ));
            }
        }

        ValidationError::check(issues)
    }
}

/// Absolute http(s) URL with a host.
pub fn is_http_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FieldIssue, ValidationError};
use crate::language::Language;
use crate::models::report::is_http_url;

/// Longest accepted `text` payload, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Url,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Url => "url",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub input_type: InputType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target_language: Language,
    #[serde(default)]
    pub save_report: bool,
}

impl GenerateReportRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input_type: InputType::Text,
            text: text.into(),
            url: None,
            target_language: Language::En,
            save_report: false,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            input_type: InputType::Url,
            text: String::new(),
            url: Some(url.into()),
            target_language: Language::En,
            save_report: false,
        }
    }

    /// Decode a raw JSON body and validate it in one step.
    pub fn parse(value: serde_json::Value) -> Result<Self, ValidationError> {
        let req: GenerateReportRequest = serde_json::from_value(value)
            .map_err(|e| ValidationError::single("body", e.to_string()))?;
        req.validate()?;
        Ok(req)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.text.chars().count() > MAX_TEXT_CHARS {
            issues.push(FieldIssue::new(
                "text",
                format!("must be at most {} characters", MAX_TEXT_CHARS),
            ));
        }

        if let Some(url) = &self.url {
            if !is_http_url(url) {
                issues.push(FieldIssue::new("url", "must be an absolute http(s) URL"));
            }
        }

        match self.input_type {
            InputType::Url if self.url.is_none() => {
                issues.push(FieldIssue::new("url", "URL required when inputType is url"));
            }
            InputType::Text if self.text.trim().is_empty() => {
                issues.push(FieldIssue::new("text", "Text required when inputType is text"));
            }
            _ => {}
        }

        ValidationError::check(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_text_input() {
        let req = GenerateReportRequest::parse(json!({
            "inputType": "text",
            "text": "Some claim to check.",
            "targetLanguage": "en"
        }))
        .unwrap();
        assert_eq!(req.input_type, InputType::Text);
        assert_eq!(req.text, "Some claim to check.");
        assert!(!req.save_report);
    }

    #[test]
    fn test_accepts_url_input() {
        let req = GenerateReportRequest::parse(json!({
            "inputType": "url",
            "text": "",
            "url": "https://example.com",
            "targetLanguage": "zh"
        }))
        .unwrap();
        assert_eq!(req.input_type, InputType::Url);
        assert_eq!(req.url.as_deref(), Some("https://example.com"));
        assert_eq!(req.target_language, Language::Zh);
    }

    #[test]
    fn test_defaults_applied() {
        let req = GenerateReportRequest::parse(json!({
            "inputType": "text",
            "text": "A claim"
        }))
        .unwrap();
        assert_eq!(req.target_language, Language::En);
        assert!(!req.save_report);
    }

    #[test]
    fn test_rejects_url_input_without_url() {
        let err = GenerateReportRequest::parse(json!({
            "inputType": "url",
            "text": "",
            "targetLanguage": "en"
        }))
        .unwrap_err();
        assert!(err.has_field("url"));
    }

    #[test]
    fn test_rejects_blank_text_input() {
        let err = GenerateReportRequest::parse(json!({
            "inputType": "text",
            "text": "   \n\t ",
            "targetLanguage": "en"
        }))
        .unwrap_err();
        assert!(err.has_field("text"));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let err = GenerateReportRequest::parse(json!({
            "inputType": "url",
            "url": "not-a-url"
        }))
        .unwrap_err();
        assert!(err.has_field("url"));
    }

    #[test]
    fn test_rejects_unknown_target_language() {
        let err = GenerateReportRequest::parse(json!({
            "inputType": "text",
            "text": "claim",
            "targetLanguage": "fr"
        }))
        .unwrap_err();
        assert!(err.has_field("body"));
    }

    #[test]
    fn test_rejects_unknown_input_type() {
        assert!(GenerateReportRequest::parse(json!({
            "inputType": "image",
            "text": "claim"
        }))
        .is_err());
    }

    #[test]
    fn test_rejects_oversized_text() {
        let err = GenerateReportRequest::parse(json!({
            "inputType": "text",
            "text": "x".repeat(MAX_TEXT_CHARS + 1)
        }))
        .unwrap_err();
        assert!(err.has_field("text"));
    }
}

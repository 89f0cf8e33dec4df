//! Report synthesis — one LLM call turned into a validated `CredibilityReport`
//!
//! The model only supplies the assessment fields. The reference list and the
//! disclaimer are always taken from the server, so the model cannot invent
//! citations. Any failure (no credentials, transport, bad JSON, schema
//! violation) yields the deterministic fallback report as `Synthesis::Degraded`.

use std::sync::Arc;

use crate::llm::{parse_json_object, ChatBackend, ChatMessage, CompletionOptions, LlmError};
use crate::models::report::{MAX_REFERENCES, DISCLAIMER};
use crate::models::{CredibilityRating, CredibilityReport, TrustedReference};

const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Characters of the claim kept in the fallback summary.
const FALLBACK_SUMMARY_CHARS: usize = 500;

const FALLBACK_CONTEXT: &str = "This is a summary of the content you submitted. VeriSG could not run full analysis. Please verify important claims with official sources (e.g. gov.sg, MOH, SPF).";

const SYSTEM_PROMPT: &str = r#"You are a neutral information-credibility assistant for Singapore and its multilingual communities. You do not deliver definitive fact-checks; you help people judge how credible a claim is and point them to trusted sources.

Reply with one JSON object containing exactly these keys and nothing else (no markdown):
- rating: one of "Likely True" | "Unclear" | "Likely Misleading" | "Likely False"
- confidence: number from 0 to 100, calibrated; stay mid-range when unsure
- reasons: array of short evidence signals (source quality, agreement across sources, recency, sensational wording, missing attribution, ...)
- context: 2-4 neutral sentences explaining what the claim is about
- whatToDoNext: one short sentence suggesting the next verification step
- claimSummary: 1-3 neutral sentences summarising the claim

Never create or amplify misinformation. If the content looks harmful, give neutral guidance and direct the reader to official sources. Cite only the trusted references you are given; never invent citations."#;

/// Outcome of synthesis: a model-backed report or the canned fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    Ok(CredibilityReport),
    Degraded {
        report: CredibilityReport,
        reason: String,
    },
}

impl Synthesis {
    pub fn report(&self) -> &CredibilityReport {
        match self {
            Synthesis::Ok(report) | Synthesis::Degraded { report, .. } => report,
        }
    }

    pub fn into_report(self) -> CredibilityReport {
        match self {
            Synthesis::Ok(report) | Synthesis::Degraded { report, .. } => report,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Synthesis::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Synthesis::Ok(_) => None,
            Synthesis::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Clone)]
pub struct ReportSynthesizer {
    backend: Option<Arc<dyn ChatBackend>>,
    prompt_char_limit: usize,
}

impl ReportSynthesizer {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, prompt_char_limit: usize) -> Self {
        Self {
            backend,
            prompt_char_limit,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn synthesize(&self, claim_summary: &str, refs: &[TrustedReference]) -> Synthesis {
        let refs = &refs[..refs.len().min(MAX_REFERENCES)];

        let backend = match &self.backend {
            Some(b) => b,
            None => {
                return Synthesis::Degraded {
                    report: fallback_report(claim_summary, refs),
                    reason: LlmError::MissingApiKey.to_string(),
                }
            }
        };

        match self.try_synthesize(backend.as_ref(), claim_summary, refs).await {
            Ok(report) => Synthesis::Ok(report),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    model = backend.model(),
                    "Report synthesis failed — returning fallback report"
                );
                Synthesis::Degraded {
                    report: fallback_report(claim_summary, refs),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_synthesize(
        &self,
        backend: &dyn ChatBackend,
        claim_summary: &str,
        refs: &[TrustedReference],
    ) -> Result<CredibilityReport, LlmError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(claim_summary, refs, self.prompt_char_limit)),
        ];

        let raw = backend
            .complete(&messages, CompletionOptions::json(SYNTHESIS_TEMPERATURE))
            .await?;

        let parsed = parse_json_object(&raw)?;
        let merged = merge_server_fields(parsed, refs);
        Ok(CredibilityReport::from_value(merged)?)
    }
}

/// Numbered reference list as shown to the model.
pub fn format_reference_list(refs: &[TrustedReference]) -> String {
    refs.iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}: {}", i + 1, r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn user_prompt(claim_summary: &str, refs: &[TrustedReference], char_limit: usize) -> String {
    let claim: String = claim_summary.chars().take(char_limit).collect();
    format!(
        "Claim/content to assess:\n---\n{}\n---\n\nTrusted references (cite only these, by title or URL):\n{}\n\nReturn a single JSON object with: rating, confidence, reasons, context, whatToDoNext, claimSummary.",
        claim,
        format_reference_list(refs)
    )
}

/// Overwrite `trustedReferences` and `disclaimer` with server values.
/// Non-object replies become an object holding only those fields, which then
/// fails validation.
fn merge_server_fields(parsed: serde_json::Value, refs: &[TrustedReference]) -> serde_json::Value {
    let mut obj = match parsed {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    obj.insert(
        "trustedReferences".to_string(),
        serde_json::to_value(refs).unwrap_or_default(),
    );
    obj.insert(
        "disclaimer".to_string(),
        serde_json::Value::String(DISCLAIMER.to_string()),
    );
    serde_json::Value::Object(obj)
}

/// Deterministic report used whenever the model is unavailable or misbehaves.
pub fn fallback_report(claim_summary: &str, refs: &[TrustedReference]) -> CredibilityReport {
    let summary: String = claim_summary.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    let summary = if summary.is_empty() {
        "No summary available.".to_string()
    } else {
        summary
    };

    CredibilityReport {
        rating: CredibilityRating::Unclear,
        confidence: 50.0,
        reasons: vec![
            "Automated analysis was not available; verify with official sources.".to_string(),
            "Cross-check with trusted Singapore government and health sites.".to_string(),
        ],
        context: FALLBACK_CONTEXT.to_string(),
        trusted_references: refs.iter().take(MAX_REFERENCES).cloned().collect(),
        what_to_do_next: "Check official advisories and primary sources before making decisions."
            .to_string(),
        claim_summary: summary,
        disclaimer: Some(DISCLAIMER.to_string()),
    }
}

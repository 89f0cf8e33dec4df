//! Report translation
//!
//! Best-effort second LLM call that re-renders the human-readable fields of a
//! report. Output is parsed by line prefix; anything that goes wrong yields an
//! empty map and the English report is delivered unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::language::Language;
use crate::llm::{ChatBackend, ChatMessage, CompletionOptions};
use crate::models::CredibilityReport;

const TRANSLATION_TEMPERATURE: f32 = 0.2;

const RATING_PREFIX: &str = "Rating:";
const CONTEXT_PREFIX: &str = "Context:";
const NEXT_PREFIX: &str = "What to do next:";

/// Translated field values keyed by report field name
/// (`rating`, `context`, `whatToDoNext`, `reasons`).
pub type Translation = BTreeMap<String, String>;

#[derive(Clone)]
pub struct Translator {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl Translator {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>) -> Self {
        Self { backend }
    }

    pub async fn translate(&self, report: &CredibilityReport, target: Language) -> Translation {
        if target == Language::En {
            return Translation::new();
        }
        let backend = match &self.backend {
            Some(b) => b,
            None => return Translation::new(),
        };

        let messages = [
            ChatMessage::system(format!(
                "Translate the following text to {}. Keep the same structure (lines starting with \"{}\", \"{}\", \"{}\", and bullet reasons). Return only the translated text.",
                target.translation_name(),
                RATING_PREFIX,
                CONTEXT_PREFIX,
                NEXT_PREFIX
            )),
            ChatMessage::user(source_text(report)),
        ];

        match backend
            .complete(&messages, CompletionOptions::text(TRANSLATION_TEMPERATURE))
            .await
        {
            Ok(reply) => parse_translation(&reply),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    target = %target,
                    "Report translation failed, skipping"
                );
                Translation::new()
            }
        }
    }
}

/// Lines sent for translation: the three labelled fields, then one reason per line.
pub fn source_text(report: &CredibilityReport) -> String {
    let mut lines = vec![
        format!("{} {}", RATING_PREFIX, report.rating),
        format!("{} {}", CONTEXT_PREFIX, report.context),
        format!("{} {}", NEXT_PREFIX, report.what_to_do_next),
    ];
    lines.extend(report.reasons.iter().cloned());
    lines.join("\n")
}

/// Split a translated reply back into fields by line prefix.
///
/// Unlabelled non-blank lines are reasons (leading `-`/`*` bullets removed),
/// joined with newlines. Later labelled lines overwrite earlier ones.
pub fn parse_translation(reply: &str) -> Translation {
    let mut result = Translation::new();
    let mut reasons = Vec::new();

    for line in reply.lines() {
        if let Some(rest) = line.strip_prefix(RATING_PREFIX) {
            result.insert("rating".to_string(), rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(CONTEXT_PREFIX) {
            result.insert("context".to_string(), rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(NEXT_PREFIX) {
            result.insert("whatToDoNext".to_string(), rest.trim().to_string());
        } else if !line.trim().is_empty() {
            let line = line.trim_start();
            let reason = line
                .strip_prefix(['-', '*'])
                .unwrap_or(line)
                .trim();
            reasons.push(reason.to_string());
        }
    }

    if !reasons.is_empty() {
        result.insert("reasons".to_string(), reasons.join("\n"));
    }
    result
}

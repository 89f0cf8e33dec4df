//! Report-generation pipeline
//!
//! extract (URL inputs) → detect language → match references → synthesize →
//! validate → translate (non-English targets)
//!
//! External failures degrade instead of failing the request: a failed fetch
//! falls back to the submitted text, a failed model call to the canned report,
//! a failed translation to no translation.

use crate::error::ValidationError;
use crate::extract::ContentExtractor;
use crate::language::{detect_language, Language};
use crate::models::{CredibilityReport, GenerateReportRequest, InputType};
use crate::references::TrustedSources;
use crate::synthesis::ReportSynthesizer;
use crate::translate::{Translation, Translator};

/// Characters of content forwarded as the claim.
pub const CLAIM_SUMMARY_CHARS: usize = 2000;

pub const FETCH_FAILED_NOTICE: &str =
    "(Failed to fetch URL content. You may paste the text manually.)";

/// Everything the pipeline needs, built once at startup and shared.
#[derive(Clone)]
pub struct PipelineDeps {
    pub extractor: ContentExtractor,
    pub sources: TrustedSources,
    pub synthesizer: ReportSynthesizer,
    pub translator: Translator,
    pub max_refs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReportResult {
    pub report: CredibilityReport,
    pub claim_summary: String,
    pub original_language: Language,
    pub target_language: Language,
    /// The submitted URL, present only when it was fetched successfully.
    pub source_urls: Vec<String>,
    /// `None` for English targets or when translation produced nothing.
    pub translated: Option<Translation>,
    /// Why the canned fallback report was used, if it was.
    pub degraded: Option<String>,
}

pub async fn generate_report(
    request: &GenerateReportRequest,
    deps: &PipelineDeps,
) -> Result<GenerateReportResult, ValidationError> {
    let mut content = request.text.clone();
    let mut source_urls = Vec::new();

    if let (InputType::Url, Some(url)) = (request.input_type, request.url.as_deref()) {
        match deps.extractor.fetch_and_extract(url).await {
            Ok(text) => {
                content = text;
                source_urls.push(url.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "URL fetch failed, using submitted text");
                if content.trim().is_empty() {
                    content = FETCH_FAILED_NOTICE.to_string();
                }
            }
        }
    }

    let original_language = detect_language(&content);
    let claim_summary = content
        .chars()
        .take(CLAIM_SUMMARY_CHARS)
        .collect::<String>()
        .trim()
        .to_string();

    let refs = deps.sources.relevant(&claim_summary, deps.max_refs);
    let synthesis = deps.synthesizer.synthesize(&claim_summary, &refs).await;
    let degraded = synthesis.degraded_reason().map(str::to_string);

    let report = synthesis.into_report();
    report.validate()?;

    let translated = if request.target_language == Language::En {
        None
    } else {
        let t = deps
            .translator
            .translate(&report, request.target_language)
            .await;
        (!t.is_empty()).then_some(t)
    };

    tracing::info!(
        input_type = %request.input_type,
        language = %original_language,
        target = %request.target_language,
        rating = %report.rating,
        degraded = degraded.is_some(),
        "Generated credibility report"
    );

    Ok(GenerateReportResult {
        report,
        claim_summary,
        original_language,
        target_language: request.target_language,
        source_urls,
        translated,
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::llm::ChatBackend;
    use crate::models::CredibilityRating;
    use crate::synthesis::tests::ScriptedChat;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deps(chat: Option<Arc<dyn ChatBackend>>) -> PipelineDeps {
        PipelineDeps {
            extractor: ContentExtractor::new(ExtractConfig::default()).unwrap(),
            sources: TrustedSources::bundled().unwrap(),
            synthesizer: ReportSynthesizer::new(chat.clone(), 6000),
            translator: Translator::new(chat),
            max_refs: 8,
        }
    }

    #[tokio::test]
    async fn test_text_input_without_llm_yields_fallback() {
        let req = GenerateReportRequest::text("The government announced new measures today.");
        let out = generate_report(&req, &deps(None)).await.unwrap();

        assert!(CredibilityRating::ALL.contains(&out.report.rating));
        assert_eq!(out.report.rating, CredibilityRating::Unclear);
        assert_eq!(out.original_language, Language::En);
        assert!(out.source_urls.is_empty());
        assert!(out.translated.is_none());
        assert!(out.degraded.is_some());
        let n = out.report.trusted_references.len();
        assert!((3..=8).contains(&n));
    }

    #[tokio::test]
    async fn test_chinese_text_detected() {
        let req = GenerateReportRequest::text("政府今天宣布了新的防疫措施，请市民注意。");
        let out = generate_report(&req, &deps(None)).await.unwrap();
        assert_eq!(out.original_language, Language::Zh);
    }

    #[tokio::test]
    async fn test_claim_summary_truncated_and_trimmed() {
        let text = format!("   {}", "a".repeat(3000));
        let out = generate_report(&GenerateReportRequest::text(text), &deps(None))
            .await
            .unwrap();
        // leading spaces count toward the 2000-char cut
        assert_eq!(out.claim_summary.chars().count(), CLAIM_SUMMARY_CHARS - 3);
    }

    #[tokio::test]
    async fn test_url_input_fetched_and_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>MOH reports new vaccination guidance for seniors.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/news", server.uri());
        let out = generate_report(&GenerateReportRequest::url(url.clone()), &deps(None))
            .await
            .unwrap();

        assert_eq!(out.source_urls, vec![url]);
        assert!(out.claim_summary.contains("vaccination guidance"));
    }

    #[tokio::test]
    async fn test_failed_fetch_uses_notice_and_omits_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let req = GenerateReportRequest::url(format!("{}/gone", server.uri()));
        let out = generate_report(&req, &deps(None)).await.unwrap();

        assert!(out.source_urls.is_empty());
        assert_eq!(out.claim_summary, FETCH_FAILED_NOTICE);
    }

    #[tokio::test]
    async fn test_failed_fetch_prefers_submitted_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut req = GenerateReportRequest::url(format!("{}/x", server.uri()));
        req.text = "Pasted copy of the article".to_string();
        let out = generate_report(&req, &deps(None)).await.unwrap();
        assert_eq!(out.claim_summary, "Pasted copy of the article");
    }

    #[tokio::test]
    async fn test_non_english_target_translated() {
        let chat = ScriptedChat::ok("Rating: Tidak jelas\nContext: Konteks\n- Sebab");
        let mut req = GenerateReportRequest::text("The government announced new measures today.");
        req.target_language = Language::Ms;

        // synthesis gets the translation-shaped reply, fails to parse and degrades
        let out = generate_report(&req, &deps(Some(chat.clone()))).await.unwrap();
        assert!(out.degraded.is_some());
        let translated = out.translated.expect("translation");
        assert_eq!(translated["rating"], "Tidak jelas");
        assert_eq!(chat.calls(), 2);
    }
}

//! URL content extraction
//!
//! One bounded GET per URL, markup reduced to whitespace-collapsed plain text.
//! Not a readability engine: scripts and styles are dropped, the
//! rest of the page is kept.

use std::time::Duration;

use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use thiserror::Error;

use crate::config::ExtractConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch: {status}")]
    Status { status: u16 },

    #[error("Fetch timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches pages and reduces them to plain text.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    config: ExtractConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// GET `url` and return at most `max_chars` characters of its text.
    pub async fn fetch_and_extract(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                "URL fetch returned non-success status"
            );
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| self.classify(e))?;
        let text = extract_main_text(&html);
        Ok(truncate_chars(&text, self.config.max_chars))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::Http(e)
        }
    }
}

/// Drop `<script>`/`<style>` blocks, render the rest as text, collapse whitespace.
pub fn extract_main_text(html: &str) -> String {
    let cleaned = strip_blocks(html, "script");
    let cleaned = strip_blocks(&cleaned, "style");

    let rendered = match html2text::from_read(cleaned.as_bytes(), 200) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "html2text failed, stripping tags instead");
            strip_tags(&cleaned)
        }
    };

    collapse_whitespace(&rendered)
}

fn strip_blocks(html: &str, tag: &str) -> String {
    let pattern = format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>", tag = tag);
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(html, " ").into_owned(),
        Err(_) => html.to_string(),
    }
}

fn strip_tags(html: &str) -> String {
    match Regex::new(r"<[^>]+>") {
        Ok(re) => re.replace_all(html, " ").into_owned(),
        Err(_) => html.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

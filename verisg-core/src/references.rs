//! Trusted-reference matching
//!
//! Scores each vetted source by topic-keyword overlap with the claim and
//! returns the best matches as report citations. Pure and deterministic.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VerisgError;
use crate::models::report::{MAX_REFERENCES, MIN_REFERENCES};
use crate::models::TrustedReference;

/// Sources used to top up a short match list, in order.
pub const DEFAULT_DOMAINS: [&str; 3] = ["gov.sg", "moh.gov.sg", "who.int"];

const BUNDLED_DATASET: &str = include_str!("../data/trusted-sources.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedSourceEntry {
    pub domain: String,
    pub name: String,
    pub url: String,
    pub topics: Vec<String>,
}

impl TrustedSourceEntry {
    fn to_reference(&self) -> TrustedReference {
        TrustedReference::new(self.url.clone(), self.name.clone())
    }
}

/// Read-only list of vetted sources.
#[derive(Debug, Clone)]
pub struct TrustedSources {
    entries: Vec<TrustedSourceEntry>,
}

impl TrustedSources {
    pub fn new(entries: Vec<TrustedSourceEntry>) -> Self {
        Self { entries }
    }

    /// The dataset compiled into the crate.
    pub fn bundled() -> Result<Self, VerisgError> {
        Self::from_json(BUNDLED_DATASET)
    }

    pub fn from_json(raw: &str) -> Result<Self, VerisgError> {
        let entries: Vec<TrustedSourceEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VerisgError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Bundled dataset unless a replacement file is configured.
    pub fn load(dataset_path: Option<&str>) -> Result<Self, VerisgError> {
        match dataset_path {
            Some(path) => Self::from_path(path),
            None => Self::bundled(),
        }
    }

    pub fn entries(&self) -> &[TrustedSourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn relevant(&self, sample: &str, max_refs: usize) -> Vec<TrustedReference> {
        relevant_references(sample, &self.entries, max_refs)
    }
}

fn score_source(sample_lower: &str, words: &[&str], source: &TrustedSourceEntry) -> u32 {
    let mut score = 0;
    for topic in &source.topics {
        let topic = topic.to_lowercase();
        if sample_lower.contains(&topic) {
            score += 2;
        }
        if words
            .iter()
            .any(|w| w.contains(topic.as_str()) || topic.contains(w))
        {
            score += 1;
        }
    }
    score
}

/// Pick up to `max_refs` sources relevant to `sample`.
///
/// Sources with a positive score come first, highest score first (ties keep
/// dataset order). When fewer than three match, the list is topped up with
/// `DEFAULT_DOMAINS` and then with the remaining sources in dataset order.
pub fn relevant_references(
    sample: &str,
    sources: &[TrustedSourceEntry],
    max_refs: usize,
) -> Vec<TrustedReference> {
    let max_refs = max_refs.min(MAX_REFERENCES);
    let lower = sample.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();

    let mut scored: Vec<(u32, &TrustedSourceEntry)> = sources
        .iter()
        .map(|s| (score_source(&lower, &words, s), s))
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut selected: Vec<&TrustedSourceEntry> = scored
        .iter()
        .filter(|(score, _)| *score > 0)
        .take(max_refs)
        .map(|(_, s)| *s)
        .collect();

    let minimum = MIN_REFERENCES.min(max_refs);
    if selected.len() < minimum {
        let defaults = DEFAULT_DOMAINS
            .iter()
            .filter_map(|d| sources.iter().find(|s| s.domain == *d));
        for candidate in defaults.chain(sources.iter()) {
            if selected.len() >= minimum {
                break;
            }
            if !selected.iter().any(|s| s.domain == candidate.domain) {
                selected.push(candidate);
            }
        }
    }

    selected.iter().map(|s| s.to_reference()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(domain: &str, topics: &[&str]) -> TrustedSourceEntry {
        TrustedSourceEntry {
            domain: domain.to_string(),
            name: domain.to_uppercase(),
            url: format!("https://{}", domain),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn sample_sources() -> Vec<TrustedSourceEntry> {
        vec![
            entry("gov.sg", &["government", "policy"]),
            entry("moh.gov.sg", &["health", "vaccine"]),
            entry("who.int", &["health", "pandemic"]),
            entry("police.gov.sg", &["scam", "crime"]),
            entry("nea.gov.sg", &["haze", "dengue"]),
            entry("lta.gov.sg", &["mrt", "traffic"]),
        ]
    }

    #[test]
    fn test_bundled_dataset_loads_and_has_defaults() {
        let sources = TrustedSources::bundled().expect("bundled dataset must parse");
        assert!(sources.len() >= MAX_REFERENCES);
        for d in DEFAULT_DOMAINS {
            assert!(
                sources.entries().iter().any(|s| s.domain == d),
                "default domain {} missing",
                d
            );
        }
        for s in sources.entries() {
            assert!(crate::models::report::is_http_url(&s.url), "bad url {}", s.url);
        }
    }

    #[test]
    fn test_highest_scoring_source_first() {
        let refs = relevant_references(
            "New vaccine rollout: health officials say vaccine is safe",
            &sample_sources(),
            8,
        );
        assert_eq!(refs[0].url, "https://moh.gov.sg");
        assert!(refs.iter().any(|r| r.url == "https://who.int"));
    }

    #[test]
    fn test_backfills_with_default_domains() {
        let refs = relevant_references("Beware of this scam message", &sample_sources(), 8);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].url, "https://police.gov.sg");
        assert_eq!(refs[1].url, "https://gov.sg");
        assert_eq!(refs[2].url, "https://moh.gov.sg");
    }

    #[test]
    fn test_no_match_returns_defaults() {
        let refs = relevant_references("zzzz qqqq", &sample_sources(), 8);
        let urls: Vec<_> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://gov.sg", "https://moh.gov.sg", "https://who.int"]);
    }

    #[test]
    fn test_backfill_without_default_domains_uses_dataset_order() {
        let sources = vec![
            entry("a.example", &["alpha"]),
            entry("b.example", &["beta"]),
            entry("c.example", &["gamma"]),
            entry("d.example", &["delta"]),
        ];
        let refs = relevant_references("delta news", &sources, 8);
        let urls: Vec<_> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://d.example", "https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_caps_at_max_refs() {
        let sources: Vec<_> = (0..12)
            .map(|i| entry(&format!("s{}.example", i), &["election"]))
            .collect();
        let refs = relevant_references("election results", &sources, 8);
        assert_eq!(refs.len(), 8);

        let refs = relevant_references("election results", &sources, 20);
        assert_eq!(refs.len(), MAX_REFERENCES);
    }

    #[test]
    fn test_always_between_three_and_eight_for_bundled_dataset() {
        let sources = TrustedSources::bundled().unwrap();
        let samples = [
            "The government announced new measures today.",
            "x",
            "新加坡政府宣布新的政策",
            "scam phishing fraud bank crypto investment money health vaccine haze mrt news",
        ];
        for sample in samples {
            let refs = sources.relevant(sample, 8);
            assert!(
                (MIN_REFERENCES..=MAX_REFERENCES).contains(&refs.len()),
                "{} refs for {:?}",
                refs.len(),
                sample
            );
        }
    }

    #[test]
    fn test_snippets_are_empty() {
        let refs = relevant_references("health", &sample_sources(), 8);
        assert!(refs.iter().all(|r| r.snippet.is_none()));
        assert_eq!(refs[0].title, "MOH.GOV.SG");
    }
}

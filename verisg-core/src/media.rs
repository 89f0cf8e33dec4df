//! Simulated media "deepfake risk" scoring.
//!
//! NOT a detector. The score is file size plus random noise, and every
//! response says so. Replace with a real model or third-party API before
//! presenting results as analysis.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// File size that maps to a base score of 100.
const FULL_SCALE_BYTES: f64 = 5_000_000.0;

pub const STUB_NOTE: &str =
    "This is a demo stub. Integrate a detection model or third-party API for real analysis.";

const SIMULATED_REASONS: [&str; 3] = [
    "Temporal inconsistencies (simulated)",
    "Facial cues mismatch (simulated)",
    "Compression/artifact patterns (simulated)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    pub fn from_score(score: u8) -> Self {
        if score > 60 {
            RiskLabel::High
        } else if score > 30 {
            RiskLabel::Medium
        } else {
            RiskLabel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAnalysis {
    pub file_name: String,
    pub size: u64,
    pub risk_score: u8,
    pub risk_label: RiskLabel,
    pub reasons: Vec<String>,
    pub note: String,
}

/// Simulated analysis with a random bias in `-10..=20`.
pub fn analyze_media(file_name: &str, size: u64) -> MediaAnalysis {
    let bias = rand::rng().random_range(-10..=20);
    analyze_media_with_bias(file_name, size, bias)
}

/// Deterministic core of `analyze_media`.
pub fn analyze_media_with_bias(file_name: &str, size: u64, bias: i32) -> MediaAnalysis {
    let scaled = ((size as f64 / FULL_SCALE_BYTES) * 100.0).round().min(100.0) as i32;
    let risk_score = (scaled + bias).clamp(0, 100) as u8;

    let reason_count = ((f64::from(risk_score) / 50.0) * 3.0).floor() as usize;
    let reasons = SIMULATED_REASONS
        .iter()
        .take(reason_count.max(1))
        .map(|r| r.to_string())
        .collect();

    let file_name = if file_name.trim().is_empty() {
        "uploaded".to_string()
    } else {
        file_name.to_string()
    };

    MediaAnalysis {
        file_name,
        size,
        risk_score,
        risk_label: RiskLabel::from_score(risk_score),
        reasons,
        note: STUB_NOTE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_low_risk_single_reason() {
        let a = analyze_media_with_bias("clip.mp4", 100_000, 0);
        assert_eq!(a.risk_score, 2);
        assert_eq!(a.risk_label, RiskLabel::Low);
        assert_eq!(a.reasons.len(), 1);
        assert!(a.reasons[0].contains("(simulated)"));
        assert_eq!(a.note, STUB_NOTE);
    }

    #[test]
    fn test_large_file_clamped_high() {
        let a = analyze_media_with_bias("big.mov", 50_000_000, 20);
        assert_eq!(a.risk_score, 100);
        assert_eq!(a.risk_label, RiskLabel::High);
        assert_eq!(a.reasons.len(), 3);
    }

    #[test]
    fn test_negative_bias_clamped_to_zero() {
        let a = analyze_media_with_bias("tiny.png", 10, -10);
        assert_eq!(a.risk_score, 0);
        assert_eq!(a.reasons.len(), 1);
    }

    #[test]
    fn test_medium_band() {
        // 2.5 MB -> 50
        let a = analyze_media_with_bias("m.mp4", 2_500_000, 0);
        assert_eq!(a.risk_score, 50);
        assert_eq!(a.risk_label, RiskLabel::Medium);
        assert_eq!(a.reasons.len(), 3);
    }

    #[test]
    fn test_label_boundaries() {
        assert_eq!(RiskLabel::from_score(30), RiskLabel::Low);
        assert_eq!(RiskLabel::from_score(31), RiskLabel::Medium);
        assert_eq!(RiskLabel::from_score(60), RiskLabel::Medium);
        assert_eq!(RiskLabel::from_score(61), RiskLabel::High);
    }

    #[test]
    fn test_random_score_stays_in_band() {
        for _ in 0..200 {
            let a = analyze_media("x.mp4", 1_000_000);
            // base 20, bias -10..=20
            assert!((10..=40).contains(&a.risk_score), "score {}", a.risk_score);
        }
    }

    #[test]
    fn test_blank_name_defaults() {
        assert_eq!(analyze_media_with_bias("  ", 1, 0).file_name, "uploaded");
    }

    #[test]
    fn test_serializes_camel_case() {
        let v = serde_json::to_value(analyze_media_with_bias("a", 1, 0)).unwrap();
        assert!(v.get("fileName").is_some());
        assert!(v.get("riskScore").is_some());
        assert_eq!(v["riskLabel"], "Low");
    }
}

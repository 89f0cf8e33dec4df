//! Script-based language detection
//!
//! Character-range heuristics only; no dictionaries, no I/O. Anything that is
//! not clearly Chinese or Tamil is reported as English.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inputs shorter than this (in characters) are not classified.
pub const MIN_DETECT_CHARS: usize = 10;

/// Fraction of CJK ideographs above which text is treated as Chinese.
pub const CJK_RATIO_THRESHOLD: f64 = 0.1;

/// Languages a report can be detected in or translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
    Ms,
    Ta,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Zh, Language::Ms, Language::Ta];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Ms => "ms",
            Language::Ta => "ta",
        }
    }

    /// Name shown to users, in the language itself.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "中文",
            Language::Ms => "Bahasa Melayu",
            Language::Ta => "தமிழ்",
        }
    }

    /// Name given to the LLM when asking for a translation.
    pub fn translation_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Simplified Chinese",
            Language::Ms => "Malay",
            Language::Ta => "Tamil",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported language '{}'", s))
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn is_tamil(c: char) -> bool {
    ('\u{0b80}'..='\u{0bff}').contains(&c)
}

/// Detect the dominant language of `text`, falling back to English.
pub fn detect_language(text: &str) -> Language {
    let total = text.chars().count();
    if total < MIN_DETECT_CHARS {
        return Language::En;
    }

    let cjk = text.chars().filter(|c| is_cjk_ideograph(*c)).count();
    if cjk as f64 / total as f64 > CJK_RATIO_THRESHOLD {
        return Language::Zh;
    }

    if text.chars().any(is_tamil) {
        return Language::Ta;
    }

    Language::En
}

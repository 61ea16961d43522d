// src/extractors/keywords.rs
use regex::{Regex, RegexBuilder};

use crate::utils::error::ExtractError;

/// Regex fragments for the AI/ML vocabulary a fragment must mention at least once.
/// Each entry is matched as a whole word, case-insensitively.
pub const DEFAULT_AI_TERMS: &[&str] = &[
    r"artificial[\s-]+intelligence",
    r"machine[\s-]+learning",
    r"deep[\s-]+learning",
    r"large[\s-]+language[\s-]+models?",
    r"llms?",
    r"neural[\s-]+networks?",
    r"natural[\s-]+language[\s-]+processing",
    r"nlp",
    r"computer[\s-]+vision",
    r"generative[\s-]+ai",
    r"gen[\s-]?ai",
    r"chat[\s-]?bots?",
    r"ai",
];

/// Immutable keyword vocabulary compiled into a single case-insensitive pattern.
#[derive(Debug, Clone)]
pub struct KeywordVocabulary {
    terms: Vec<String>,
    pattern: Regex,
}

impl KeywordVocabulary {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self, ExtractError> {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(ExtractError::RegexError("keyword vocabulary is empty".to_string()));
        }

        let alternation = terms.iter().map(|t| format!("(?:{})", t)).collect::<Vec<_>>().join("|");
        let pattern = RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
            .case_insensitive(true)
            .build()
            .map_err(|e| ExtractError::RegexError(e.to_string()))?;

        Ok(Self { terms, pattern })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Default for KeywordVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_AI_TERMS).expect("default AI vocabulary compiles")
    }
}

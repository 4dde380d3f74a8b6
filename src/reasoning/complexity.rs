//! Query complexity scoring.
//!
//! The score is a weighted blend of four factors, each in [0, 1]:
//! length (saturating in word count), technical vocabulary (saturating in
//! distinct matched terms), question type, and a bonus for multiple
//! distinct questions. Saturation is exponential (`1 - e^(-x/scale)`) so
//! long substantive queries keep climbing toward 1 instead of plateauing.

use crate::config::ComplexityConfig;

/// Scores how much deliberate reasoning a query warrants.
#[derive(Debug, Clone, Default)]
pub struct ComplexityAnalyzer {
    config: ComplexityConfig,
}

/// Per-factor breakdown of a complexity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityFactors {
    pub length: f64,
    pub technical: f64,
    pub question: f64,
    pub multi_question: f64,
}

impl ComplexityAnalyzer {
    /// Create an analyzer with the given configuration.
    pub fn new(config: ComplexityConfig) -> Self {
        Self { config }
    }

    /// Complexity of `query` in [0, 1]. Empty or whitespace-only queries
    /// score exactly 0.0.
    pub fn analyze(&self, query: &str) -> f64 {
        match self.factors(query) {
            Some(factors) => self.combine(&factors),
            None => 0.0,
        }
    }

    /// Factor breakdown, or `None` for an empty query.
    pub fn factors(&self, query: &str) -> Option<ComplexityFactors> {
        if query.trim().is_empty() {
            return None;
        }

        let normalized = query.to_lowercase();
        let words = query.split_whitespace().count() as f64;
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        Some(ComplexityFactors {
            length: saturate(words, self.config.length_scale_words),
            technical: saturate(
                self.count_technical_terms(&normalized) as f64,
                self.config.technical_scale_terms,
            ),
            question: self.question_score(&tokens),
            multi_question: multi_question_factor(query),
        })
    }

    fn combine(&self, f: &ComplexityFactors) -> f64 {
        let c = &self.config;
        let total_weight =
            c.length_weight + c.technical_weight + c.question_weight + c.multi_question_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }

        let score = f.length * c.length_weight
            + f.technical * c.technical_weight
            + f.question * c.question_weight
            + f.multi_question * c.multi_question_weight;

        (score / total_weight).clamp(0.0, 1.0)
    }

    /// Distinct terms from the vocabulary found at word starts.
    fn count_technical_terms(&self, normalized: &str) -> usize {
        self.config
            .technical_terms
            .iter()
            .filter(|term| contains_at_word_start(normalized, term))
            .count()
    }

    fn question_score(&self, tokens: &[&str]) -> f64 {
        let has = |cues: &[String]| tokens.iter().any(|t| cues.iter().any(|c| c == t));

        if has(&self.config.analytical_cues) {
            self.config.analytical_question_score
        } else if has(&self.config.factual_cues) {
            self.config.factual_question_score
        } else {
            self.config.neutral_question_score
        }
    }
}

/// `1 - e^(-x/scale)`: 0 at x = 0, approaching 1 smoothly.
fn saturate(x: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - (-x / scale).exp()
}

/// Bonus for more than one distinct question; two questions give 0.5,
/// three or more give 1.0.
fn multi_question_factor(query: &str) -> f64 {
    let questions = query
        .split('?')
        .zip(query.match_indices('?'))
        .filter(|(segment, _)| segment.chars().any(|c| c.is_alphanumeric()))
        .count();

    if questions > 1 {
        ((questions - 1) as f64 / 2.0).min(1.0)
    } else {
        0.0
    }
}

/// True if `needle` occurs in `haystack` starting at a word boundary.
/// Suffixes are allowed so "theorems" matches "theorem".
fn contains_at_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}

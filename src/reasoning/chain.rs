//! Reasoning chain data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ThinkingMode;

/// Cognitive strategy a step exhibits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStrategy {
    Algorithmic,
    Deductive,
    Inductive,
    Abductive,
    Analogical,
    Causal,
}

/// Cue phrases per strategy, checked in order. First match wins.
const STRATEGY_CUES: &[(ReasoningStrategy, &[&str])] = &[
    (
        ReasoningStrategy::Deductive,
        &[
            "therefore",
            "thus",
            "hence",
            "conclude",
            "deduce",
            "it follows",
            "implies",
            "derive",
        ],
    ),
    (
        ReasoningStrategy::Causal,
        &[
            "because",
            "causes",
            "leads to",
            "results in",
            "due to",
            "consequently",
        ],
    ),
    (
        ReasoningStrategy::Analogical,
        &["similar to", "analogy", "analogous", "comparable", "just as"],
    ),
    (
        ReasoningStrategy::Inductive,
        &["pattern", "observe", "notice", "generalize", "generalise"],
    ),
    (
        ReasoningStrategy::Abductive,
        &["likely", "probably", "best explanation", "hypothesis", "plausible"],
    ),
];

impl ReasoningStrategy {
    /// Get the tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningStrategy::Algorithmic => "algorithmic",
            ReasoningStrategy::Deductive => "deductive",
            ReasoningStrategy::Inductive => "inductive",
            ReasoningStrategy::Abductive => "abductive",
            ReasoningStrategy::Analogical => "analogical",
            ReasoningStrategy::Causal => "causal",
        }
    }

    /// Number of distinct tags.
    pub const COUNT: usize = 6;

    /// Infer the strategy from lexical cues in a step's text. Falls back to
    /// `Algorithmic`.
    pub fn infer(text: &str) -> Self {
        let normalized = text.to_lowercase();
        STRATEGY_CUES
            .iter()
            .find(|(_, cues)| cues.iter().any(|cue| contains_phrase(&normalized, cue)))
            .map(|(strategy, _)| *strategy)
            .unwrap_or(ReasoningStrategy::Algorithmic)
    }
}

impl std::fmt::Display for ReasoningStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phrase match starting at a word boundary ("thus" matches but "enthusiasm"
/// does not).
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}

/// One step of the extracted chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub id: String,
    /// 1-based position in the chain
    pub index: usize,
    pub text: String,
    pub strategy: ReasoningStrategy,
    /// Mean search value of the step's node (0.0-1.0)
    pub confidence: f64,
    pub visit_count: u32,
    pub mean_value: f64,
    /// Wall time spent generating this step
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTermination {
    /// No search was run (System 1)
    Skipped,
    /// A path reached the target depth
    Converged,
    IterationsExhausted,
    BudgetExhausted,
    Cancelled,
    /// Too many consecutive failed expansions
    ProviderFailures,
}

impl SearchTermination {
    /// Get the termination reason as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTermination::Skipped => "skipped",
            SearchTermination::Converged => "converged",
            SearchTermination::IterationsExhausted => "iterations_exhausted",
            SearchTermination::BudgetExhausted => "budget_exhausted",
            SearchTermination::Cancelled => "cancelled",
            SearchTermination::ProviderFailures => "provider_failures",
        }
    }
}

impl std::fmt::Display for SearchTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters describing one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Iterations that completed a backpropagation
    pub iterations_performed: u32,
    /// Generator calls, including retries
    pub expansion_attempts: u32,
    /// Generator calls that failed or timed out
    pub failed_expansions: u32,
    /// Nodes in the tree, excluding the root
    pub nodes_explored: usize,
    /// Visits recorded at the root; equals `iterations_performed`
    pub root_visits: u32,
    pub target_depth: usize,
    pub termination: SearchTermination,
}

impl SearchStats {
    /// Stats for a search that never ran.
    pub fn skipped() -> Self {
        Self {
            iterations_performed: 0,
            expansion_attempts: 0,
            failed_expansions: 0,
            nodes_explored: 0,
            root_visits: 0,
            target_depth: 0,
            termination: SearchTermination::Skipped,
        }
    }
}

/// Ordered reasoning trace for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    pub id: String,
    pub query: String,
    pub steps: Vec<ReasoningStep>,
    /// Mean step confidence, 0 with no steps
    pub total_confidence: f64,
    /// Count of steps per strategy tag
    pub strategy_distribution: BTreeMap<ReasoningStrategy, usize>,
    pub thinking_mode: ThinkingMode,
    pub complexity_score: f64,
    /// Text of the last step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    pub token_budget_allocated: u32,
    pub token_budget_used: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub stats: SearchStats,
}

impl ReasoningChain {
    /// A chain with no steps, as produced for System 1.
    pub fn empty(
        query: impl Into<String>,
        thinking_mode: ThinkingMode,
        complexity_score: f64,
        token_budget_allocated: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.into(),
            steps: Vec::new(),
            total_confidence: 0.0,
            strategy_distribution: BTreeMap::new(),
            thinking_mode,
            complexity_score,
            conclusion: None,
            token_budget_allocated,
            token_budget_used: 0,
            started_at: now,
            completed_at: now,
            processing_time_ms: 0,
            stats: SearchStats::skipped(),
        }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Count of steps per strategy tag.
pub(crate) fn strategy_distribution(steps: &[ReasoningStep]) -> BTreeMap<ReasoningStrategy, usize> {
    let mut distribution = BTreeMap::new();
    for step in steps {
        *distribution.entry(step.strategy).or_insert(0) += 1;
    }
    distribution
}

/// Mean of step confidences, 0 when there are none.
pub(crate) fn mean_confidence(steps: &[ReasoningStep]) -> f64 {
    if steps.is_empty() {
        0.0
    } else {
        steps.iter().map(|s| s.confidence).sum::<f64>() / steps.len() as f64
    }
}

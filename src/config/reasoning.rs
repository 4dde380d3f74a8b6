//! Tunable parameters for the reasoning core.
//!
//! Every threshold used by the complexity analyzer, the dual-process
//! engine, the budget allocator and the search engine lives here with a
//! documented default. Nothing in `crate::reasoning` hardcodes a cut-point.

use super::env_or;

/// Configuration for the whole reasoning pipeline.
#[derive(Debug, Clone, Default)]
pub struct ReasoningConfig {
    /// Complexity scoring weights and vocabulary
    pub complexity: ComplexityConfig,

    /// Thinking-mode decision thresholds
    pub decision: DecisionConfig,

    /// Token budget tiers and multipliers
    pub budget: BudgetConfig,

    /// Tree search parameters
    pub search: SearchConfig,

    /// Provider token ceiling used when a caller supplies none
    pub default_provider_max_tokens: Option<u32>,
}

impl ReasoningConfig {
    /// Load from environment variables, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            complexity: ComplexityConfig::default(),
            decision: DecisionConfig::default(),
            budget: BudgetConfig::from_env(),
            search: SearchConfig::from_env(),
            default_provider_max_tokens: std::env::var("DEFAULT_PROVIDER_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

/// Weights and vocabulary for query complexity scoring.
#[derive(Debug, Clone)]
pub struct ComplexityConfig {
    /// Weight of the word-count factor
    pub length_weight: f64,

    /// Weight of the technical-vocabulary factor
    pub technical_weight: f64,

    /// Weight of the question-type factor
    pub question_weight: f64,

    /// Weight of the multiple-questions bonus
    pub multi_question_weight: f64,

    /// Word count at which the length factor reaches ~63% (1 - 1/e)
    pub length_scale_words: f64,

    /// Distinct technical terms at which the vocabulary factor reaches ~63%
    pub technical_scale_terms: f64,

    /// Question factor for why/how/explain style queries
    pub analytical_question_score: f64,

    /// Question factor when no question cue is present
    pub neutral_question_score: f64,

    /// Question factor for what/when/who style queries
    pub factual_question_score: f64,

    /// Words marking analytical questions
    pub analytical_cues: Vec<String>,

    /// Words marking factual questions
    pub factual_cues: Vec<String>,

    /// Curated technical vocabulary (matched at word starts)
    pub technical_terms: Vec<String>,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            length_weight: 0.25,
            technical_weight: 0.40,
            question_weight: 0.25,
            multi_question_weight: 0.10,
            length_scale_words: 40.0,
            technical_scale_terms: 1.5,
            analytical_question_score: 0.9,
            neutral_question_score: 0.5,
            factual_question_score: 0.2,
            analytical_cues: to_strings(&[
                "why", "how", "explain", "analyze", "analyse", "evaluate", "compare",
                "contrast", "justify", "critique", "prove", "derive", "describe",
                "understand", "relate", "relates", "connect", "connects", "interpret",
                "implication", "implications",
            ]),
            factual_cues: to_strings(&[
                "what", "when", "who", "where", "which", "define", "list", "name",
            ]),
            technical_terms: to_strings(DEFAULT_TECHNICAL_TERMS),
        }
    }
}

const DEFAULT_TECHNICAL_TERMS: &[&str] = &[
    // Computer science
    "algorithm", "optimization", "complexity", "architecture", "implementation",
    "compilation", "compiler", "recursion", "recursive", "polymorphism", "concurrency",
    "distributed", "binary", "hash", "encryption", "asymptotic", "memoization",
    "dynamic programming", "data structure", "pointer", "heuristic",
    // Mathematics
    "derivative", "integral", "theorem", "proof", "equation", "matrix", "matrices",
    "logarithm", "exponential", "probability", "statistic", "calculus", "differential",
    "polynomial", "geometric", "algebraic", "eigenvalue", "vector", "topology",
    // Physics
    "quantum", "relativity", "entropy", "momentum", "acceleration", "velocity",
    "energy", "electromagnetic", "particle", "wave", "entanglement", "photon",
    "electron", "nuclear", "thermodynamic", "superposition", "polarization",
    "locality", "epr", "paradox", "mechanics", "spacetime",
    // Scientific method and life sciences
    "hypothesis", "analysis", "synthesis", "experiment", "methodology", "variable",
    "correlation", "causation", "empirical", "theoretical", "molecular", "cellular",
    "genetic", "biochemical", "evolutionary", "photosynthesis", "chlorophyll",
    "enzyme", "metabolism", "mitochondria",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Thresholds and confidences for the dual-process decision.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Below this complexity a confident learner gets System 1 outright
    pub trivial_complexity: f64,

    /// Emotion factor at or above which a learner counts as confident
    pub confident_emotion: f64,

    /// Below this complexity the blended score may still pick System 1
    pub moderate_complexity: f64,

    /// Blended score above which the moderate System 1 rule fires
    pub fast_path_score: f64,

    /// Above this complexity the engine always deliberates (System 2)
    pub high_complexity: f64,

    /// Blend weight of (1 - complexity)
    pub simplicity_weight: f64,

    /// Blend weight of the emotion factor
    pub emotion_weight: f64,

    /// Blend weight of (1 - cognitive load)
    pub load_weight: f64,

    /// Blend weight of readiness
    pub readiness_weight: f64,

    /// Confidence of the trivial System 1 rule
    pub trivial_confidence: f64,

    /// Confidence of the blended System 1 rule
    pub fast_path_confidence: f64,

    /// System 2 confidence at the high-complexity threshold
    pub deliberate_confidence_min: f64,

    /// System 2 confidence at complexity 1.0
    pub deliberate_confidence_max: f64,

    /// Hybrid confidence at the edges of the hybrid band
    pub hybrid_confidence_min: f64,

    /// Hybrid confidence at the centre of the hybrid band
    pub hybrid_confidence_max: f64,

    /// Confidence reported by the fail-safe decision
    pub fallback_confidence: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            trivial_complexity: 0.2,
            confident_emotion: 0.7,
            moderate_complexity: 0.4,
            fast_path_score: 0.75,
            high_complexity: 0.7,
            simplicity_weight: 0.30,
            emotion_weight: 0.25,
            load_weight: 0.25,
            readiness_weight: 0.20,
            trivial_confidence: 0.90,
            fast_path_confidence: 0.85,
            deliberate_confidence_min: 0.70,
            deliberate_confidence_max: 0.90,
            hybrid_confidence_min: 0.70,
            hybrid_confidence_max: 0.80,
            fallback_confidence: 0.5,
        }
    }
}

/// Token budget tiers and adjustment ranges.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Base budget of the conservative tier
    pub conservative_base: u32,

    /// Base budget of the balanced tier
    pub balanced_base: u32,

    /// Base budget of the aggressive tier
    pub aggressive_base: u32,

    /// Tier score at which the balanced tier starts
    pub balanced_from: f64,

    /// Tier score at which the aggressive tier starts
    pub aggressive_from: f64,

    /// Weight of complexity in the tier score
    pub tier_complexity_weight: f64,

    /// Weight of the readiness gap (1 - readiness) in the tier score
    pub tier_readiness_weight: f64,

    /// Weight of learner struggle in the tier score. Struggle is
    /// 1 - the label's confidence score when a label is present,
    /// otherwise 1 - emotion factor.
    pub tier_emotion_weight: f64,

    /// Reasoning share of the total at complexity 0
    pub reasoning_ratio_min: f64,

    /// Reasoning share of the total at complexity 1
    pub reasoning_ratio_max: f64,

    /// Fraction of the provider ceiling that may be allocated
    pub safety_margin: f64,

    /// Smallest total budget handed out when the ceiling allows it
    pub min_total_tokens: u32,

    /// Ceiling assumed when the caller supplies none
    pub fallback_provider_max_tokens: u32,

    /// Complexity factor at complexity 0
    pub complexity_factor_base: f64,

    /// Complexity factor growth from complexity 0 to 1
    pub complexity_factor_span: f64,

    /// Emotion multiplier for a fully struggling learner (factor 0)
    pub emotion_multiplier_struggling: f64,

    /// Emotion multiplier for a fully confident learner (factor 1)
    pub emotion_multiplier_confident: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            conservative_base: 2500,
            balanced_base: 4000,
            aggressive_base: 6500,
            balanced_from: 0.3,
            aggressive_from: 0.6,
            tier_complexity_weight: 0.6,
            tier_readiness_weight: 0.2,
            tier_emotion_weight: 0.2,
            reasoning_ratio_min: 0.4,
            reasoning_ratio_max: 0.7,
            safety_margin: 0.9,
            min_total_tokens: 500,
            fallback_provider_max_tokens: 4096,
            complexity_factor_base: 0.8,
            complexity_factor_span: 0.4,
            emotion_multiplier_struggling: 1.5,
            emotion_multiplier_confident: 0.9,
        }
    }
}

impl BudgetConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fallback_provider_max_tokens: env_or(
                "FALLBACK_PROVIDER_MAX_TOKENS",
                defaults.fallback_provider_max_tokens,
            ),
            safety_margin: env_or("BUDGET_SAFETY_MARGIN", defaults.safety_margin),
            ..defaults
        }
    }
}

/// Monte-Carlo tree search parameters.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// UCB exploration constant (C)
    pub exploration_constant: f64,

    /// Maximum children per node
    pub branching_factor: usize,

    /// A node whose best child averages below this may grow a sibling
    pub widen_threshold: f64,

    /// Target chain depth in hybrid mode
    pub hybrid_depth: usize,

    /// Target chain depth in System 2 at complexity 0
    pub deliberate_min_depth: usize,

    /// Target chain depth in System 2 at complexity 1
    pub deliberate_max_depth: usize,

    /// Default iteration cap when the caller supplies none
    pub max_iterations: usize,

    /// Token cap for a single expansion
    pub max_step_tokens: u32,

    /// Below this many remaining reasoning tokens the search stops
    pub min_step_tokens: u32,

    /// Timeout for one generation call
    pub expansion_timeout_ms: u64,

    /// Extra attempts after a failed generation call
    pub expansion_retries: u32,

    /// Failed rounds in a row that end the search
    pub max_consecutive_failures: u32,

    /// Share of the node value taken from model-reported confidence
    pub confidence_weight: f64,

    /// Words at which a step counts as fully developed
    pub step_length_saturation_words: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            branching_factor: 2,
            widen_threshold: 0.5,
            hybrid_depth: 3,
            deliberate_min_depth: 6,
            deliberate_max_depth: 10,
            max_iterations: 20,
            max_step_tokens: 200,
            min_step_tokens: 32,
            expansion_timeout_ms: 15000,
            expansion_retries: 1,
            max_consecutive_failures: 3,
            confidence_weight: 0.7,
            step_length_saturation_words: 50.0,
        }
    }
}

impl SearchConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            exploration_constant: env_or(
                "MCTS_EXPLORATION_CONSTANT",
                defaults.exploration_constant,
            ),
            max_iterations: env_or("MCTS_MAX_ITERATIONS", defaults.max_iterations),
            expansion_timeout_ms: env_or("EXPANSION_TIMEOUT_MS", defaults.expansion_timeout_ms),
            expansion_retries: env_or("EXPANSION_RETRIES", defaults.expansion_retries),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_weights_sum_to_one() {
        let config = ComplexityConfig::default();
        let sum = config.length_weight
            + config.technical_weight
            + config.question_weight
            + config.multi_question_weight;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decision_blend_weights_sum_to_one() {
        let config = DecisionConfig::default();
        let sum = config.simplicity_weight
            + config.emotion_weight
            + config.load_weight
            + config.readiness_weight;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decision_thresholds_are_ordered() {
        let config = DecisionConfig::default();
        assert!(config.trivial_complexity < config.moderate_complexity);
        assert!(config.moderate_complexity < config.high_complexity);
        assert!(config.hybrid_confidence_min <= config.hybrid_confidence_max);
    }

    #[test]
    fn test_budget_tiers_are_ordered() {
        let config = BudgetConfig::default();
        assert!(config.conservative_base < config.balanced_base);
        assert!(config.balanced_base < config.aggressive_base);
        assert!(config.balanced_from < config.aggressive_from);
        assert!(config.reasoning_ratio_min < config.reasoning_ratio_max);
    }

    #[test]
    fn test_search_defaults() {
        let config = SearchConfig::default();
        assert!((config.exploration_constant - 1.41421356).abs() < 1e-6);
        assert!(config.deliberate_min_depth <= config.deliberate_max_depth);
        assert!(config.hybrid_depth < config.deliberate_min_depth);
        assert!(config.min_step_tokens < config.max_step_tokens);
    }

    #[test]
    fn test_technical_terms_are_lowercase() {
        let config = ComplexityConfig::default();
        assert!(config
            .technical_terms
            .iter()
            .all(|t| t == &t.to_lowercase()));
    }
}

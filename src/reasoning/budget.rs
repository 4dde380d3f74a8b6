//! Dynamic token budget allocation.
//!
//! A tier base (chosen from complexity, readiness and learner struggle) is
//! scaled by four
//! independent multipliers, floored, capped at the provider ceiling minus
//! a safety margin, then split between reasoning and response with a
//! reasoning share that grows continuously with complexity.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SignalSet, ThinkingMode};
use crate::config::BudgetConfig;
use crate::error::{ensure_unit, ReasoningResult};

/// Token allocation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    Conservative,
    Balanced,
    Aggressive,
}

impl BudgetMode {
    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetMode::Conservative => "conservative",
            BudgetMode::Balanced => "balanced",
            BudgetMode::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for BudgetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token split for one query.
///
/// Invariant: `reasoning_tokens + response_tokens <= total_tokens <=
/// provider_max_tokens * safety_margin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub total_tokens: u32,
    pub reasoning_tokens: u32,
    pub response_tokens: u32,
    pub mode: BudgetMode,
    /// Reasoning share of the total
    pub reasoning_ratio: f64,
    pub complexity_factor: f64,
    pub emotion_multiplier: f64,
    pub load_multiplier: f64,
    pub readiness_multiplier: f64,
    /// Ceiling the budget was capped against
    pub provider_max_tokens: u32,
    pub thinking_mode: ThinkingMode,
    /// True when this is the fail-safe budget
    #[serde(default)]
    pub fallback: bool,
}

impl TokenBudget {
    /// Fail-safe budget: the conservative tier split evenly, still capped
    /// by the provider ceiling.
    pub fn fallback(
        thinking_mode: ThinkingMode,
        provider_max_tokens: Option<u32>,
        config: &BudgetConfig,
    ) -> Self {
        let provider_max_tokens = effective_ceiling(provider_max_tokens, config);
        let total_tokens = config
            .conservative_base
            .min(safe_ceiling(provider_max_tokens, config));
        let reasoning_tokens = total_tokens / 2;
        Self {
            total_tokens,
            reasoning_tokens,
            response_tokens: total_tokens - reasoning_tokens,
            mode: BudgetMode::Conservative,
            reasoning_ratio: 0.5,
            complexity_factor: 1.0,
            emotion_multiplier: 1.0,
            load_multiplier: 1.0,
            readiness_multiplier: 1.0,
            provider_max_tokens,
            thinking_mode,
            fallback: true,
        }
    }
}

/// Sizes the reasoning/response token split.
#[derive(Debug, Clone, Default)]
pub struct BudgetAllocator {
    config: BudgetConfig,
}

impl BudgetAllocator {
    /// Create an allocator with the given tiers and ranges.
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// Access the configuration.
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Allocate, falling back to the conservative budget on invalid input.
    pub fn allocate(
        &self,
        complexity: f64,
        signals: &SignalSet,
        thinking_mode: ThinkingMode,
        provider_max_tokens: Option<u32>,
    ) -> TokenBudget {
        match self.try_allocate(complexity, signals, thinking_mode, provider_max_tokens) {
            Ok(budget) => budget,
            Err(e) => {
                warn!(
                    error = %e,
                    complexity = complexity,
                    thinking_mode = %thinking_mode,
                    "Budget allocation failed, using conservative fallback"
                );
                TokenBudget::fallback(thinking_mode, provider_max_tokens, &self.config)
            }
        }
    }

    /// Allocate, rejecting NaN or out-of-range signals.
    ///
    /// A missing or zero `provider_max_tokens` is not an error: the
    /// configured fallback ceiling is used and a warning is logged.
    pub fn try_allocate(
        &self,
        complexity: f64,
        signals: &SignalSet,
        thinking_mode: ThinkingMode,
        provider_max_tokens: Option<u32>,
    ) -> ReasoningResult<TokenBudget> {
        let complexity = ensure_unit("complexity", complexity)?;
        let emotion_factor = ensure_unit("emotion_factor", signals.emotion_factor)?;
        let load = ensure_unit("cognitive_load", signals.cognitive_load)?;
        let readiness = ensure_unit("readiness", signals.readiness)?;

        let c = &self.config;
        let struggle = match signals.primary_emotion {
            Some(emotion) => 1.0 - emotion.confidence_score(),
            None => 1.0 - emotion_factor,
        };
        let mode = self.select_mode(complexity, readiness, struggle);
        let base = match mode {
            BudgetMode::Conservative => c.conservative_base,
            BudgetMode::Balanced => c.balanced_base,
            BudgetMode::Aggressive => c.aggressive_base,
        };

        let complexity_factor = c.complexity_factor_base + complexity * c.complexity_factor_span;
        let emotion_multiplier = match signals.primary_emotion {
            Some(emotion) => emotion.budget_multiplier(),
            None => {
                c.emotion_multiplier_struggling
                    - emotion_factor
                        * (c.emotion_multiplier_struggling - c.emotion_multiplier_confident)
            }
        }
        .clamp(0.5, 2.0);
        let load_multiplier = (1.5 - load).clamp(0.5, 1.5);
        let readiness_multiplier = 0.5 + 0.8 * readiness;

        let raw = base as f64
            * complexity_factor
            * emotion_multiplier
            * load_multiplier
            * readiness_multiplier;

        let provider_max_tokens = effective_ceiling(provider_max_tokens, c);
        let ceiling = safe_ceiling(provider_max_tokens, c);
        let total_tokens = (raw.round() as u32).max(c.min_total_tokens).min(ceiling);

        let reasoning_ratio = c.reasoning_ratio_min
            + complexity * (c.reasoning_ratio_max - c.reasoning_ratio_min);
        let reasoning_tokens = ((total_tokens as f64 * reasoning_ratio).floor() as u32).min(total_tokens);
        let response_tokens = total_tokens - reasoning_tokens;

        debug!(
            mode = %mode,
            total_tokens = total_tokens,
            reasoning_tokens = reasoning_tokens,
            response_tokens = response_tokens,
            ceiling = ceiling,
            "Token budget allocated"
        );

        Ok(TokenBudget {
            total_tokens,
            reasoning_tokens,
            response_tokens,
            mode,
            reasoning_ratio,
            complexity_factor,
            emotion_multiplier,
            load_multiplier,
            readiness_multiplier,
            provider_max_tokens,
            thinking_mode,
            fallback: false,
        })
    }

    /// Higher complexity, lower readiness and more struggle push toward
    /// larger tiers. Cognitive load never changes the tier.
    fn select_mode(&self, complexity: f64, readiness: f64, struggle: f64) -> BudgetMode {
        let c = &self.config;
        let total_weight = c.tier_complexity_weight + c.tier_readiness_weight + c.tier_emotion_weight;
        let score = if total_weight > 0.0 {
            (c.tier_complexity_weight * complexity
                + c.tier_readiness_weight * (1.0 - readiness)
                + c.tier_emotion_weight * struggle)
                / total_weight
        } else {
            complexity
        };
        if score >= c.aggressive_from {
            BudgetMode::Aggressive
        } else if score >= c.balanced_from {
            BudgetMode::Balanced
        } else {
            BudgetMode::Conservative
        }
    }
}

fn effective_ceiling(provider_max_tokens: Option<u32>, config: &BudgetConfig) -> u32 {
    match provider_max_tokens {
        Some(max) if max > 0 => max,
        other => {
            warn!(
                provider_max_tokens = ?other,
                fallback = config.fallback_provider_max_tokens,
                "Missing or invalid provider token ceiling, using fallback"
            );
            config.fallback_provider_max_tokens
        }
    }
}

fn safe_ceiling(provider_max_tokens: u32, config: &BudgetConfig) -> u32 {
    let margin = if config.safety_margin.is_finite() {
        config.safety_margin.clamp(0.0, 1.0)
    } else {
        0.9
    };
    (provider_max_tokens as f64 * margin).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::Emotion;

    fn allocator() -> BudgetAllocator {
        BudgetAllocator::default()
    }

    fn neutral() -> SignalSet {
        SignalSet::new(0.5, 0.5, 0.5)
    }

    fn assert_invariant(budget: &TokenBudget, provider: u32) {
        assert!(budget.reasoning_tokens + budget.response_tokens <= budget.total_tokens);
        assert!(budget.total_tokens <= provider);
        assert!(budget.total_tokens as f64 <= provider as f64 * 0.9);
    }

    #[test]
    fn test_invariant_holds_over_grid() {
        let values = [0.0, 0.1, 0.35, 0.5, 0.77, 1.0];
        for provider in [1, 64, 600, 4096, 8192, 200_000] {
            for &c in &values {
                for &ef in &values {
                    for &load in &values {
                        for &r in &values {
                            let budget = allocator().allocate(
                                c,
                                &SignalSet::new(ef, load, r),
                                ThinkingMode::Hybrid,
                                Some(provider),
                            );
                            assert_invariant(&budget, provider);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_total_monotonic_in_complexity() {
        let mut previous = 0;
        for i in 0..=20 {
            let c = i as f64 / 20.0;
            let budget = allocator().allocate(c, &neutral(), ThinkingMode::Hybrid, Some(100_000));
            assert!(budget.total_tokens >= previous, "dropped at complexity {}", c);
            previous = budget.total_tokens;
        }
    }

    #[test]
    fn test_total_monotonic_in_inverse_load() {
        let mut previous = 0;
        for i in (0..=20).rev() {
            let load = i as f64 / 20.0;
            let budget = allocator().allocate(
                0.6,
                &SignalSet::new(0.5, load, 0.5),
                ThinkingMode::Hybrid,
                Some(100_000),
            );
            assert!(budget.total_tokens >= previous, "dropped at load {}", load);
            previous = budget.total_tokens;
        }
    }

    #[test]
    fn test_tier_selection() {
        let a = allocator();
        assert_eq!(a.select_mode(0.0, 1.0, 0.5), BudgetMode::Conservative);
        assert_eq!(a.select_mode(0.5, 0.5, 0.5), BudgetMode::Balanced);
        assert_eq!(a.select_mode(0.9, 0.2, 0.5), BudgetMode::Aggressive);
        // low readiness alone lifts the tier
        assert_eq!(a.select_mode(0.2, 0.0, 0.0), BudgetMode::Balanced);
    }

    #[test]
    fn test_struggling_learner_gets_higher_tier() {
        let base = SignalSet::new(0.5, 0.5, 0.8);
        let confused = allocator().allocate(
            0.3,
            &base.clone().with_emotion(Emotion::Confused),
            ThinkingMode::Hybrid,
            Some(100_000),
        );
        let confident = allocator().allocate(
            0.3,
            &base.with_emotion(Emotion::Confident),
            ThinkingMode::Hybrid,
            Some(100_000),
        );
        assert_eq!(confident.mode, BudgetMode::Conservative);
        assert_eq!(confused.mode, BudgetMode::Balanced);

        let low = allocator().allocate(0.3, &SignalSet::new(0.1, 0.5, 0.8), ThinkingMode::Hybrid, Some(100_000));
        let high = allocator().allocate(0.3, &SignalSet::new(0.9, 0.5, 0.8), ThinkingMode::Hybrid, Some(100_000));
        assert_eq!(low.mode, BudgetMode::Balanced);
        assert_eq!(high.mode, BudgetMode::Conservative);
    }

    #[test]
    fn test_load_does_not_change_tier() {
        let light = allocator().allocate(0.5, &SignalSet::new(0.5, 0.0, 0.5), ThinkingMode::Hybrid, Some(100_000));
        let heavy = allocator().allocate(0.5, &SignalSet::new(0.5, 1.0, 0.5), ThinkingMode::Hybrid, Some(100_000));
        assert_eq!(light.mode, heavy.mode);
        assert!(light.total_tokens > heavy.total_tokens);
    }

    #[test]
    fn test_reasoning_ratio_continuous_in_complexity() {
        let low = allocator().allocate(0.0, &neutral(), ThinkingMode::System1, Some(100_000));
        let high = allocator().allocate(1.0, &neutral(), ThinkingMode::System2, Some(100_000));
        assert!((low.reasoning_ratio - 0.4).abs() < 1e-9);
        assert!((high.reasoning_ratio - 0.7).abs() < 1e-9);

        let a = allocator().allocate(0.699, &neutral(), ThinkingMode::Hybrid, Some(100_000));
        let b = allocator().allocate(0.701, &neutral(), ThinkingMode::System2, Some(100_000));
        assert!((b.reasoning_ratio - a.reasoning_ratio).abs() < 0.01);
    }

    #[test]
    fn test_multiplier_ranges() {
        for ef in [0.0, 0.5, 1.0] {
            for load in [0.0, 0.5, 1.0] {
                for r in [0.0, 0.5, 1.0] {
                    let b = allocator().allocate(0.5, &SignalSet::new(ef, load, r), ThinkingMode::Hybrid, Some(100_000));
                    assert!((0.5..=2.0).contains(&b.emotion_multiplier));
                    assert!((0.5..=1.5).contains(&b.load_multiplier));
                    assert!((0.5..=1.3).contains(&b.readiness_multiplier));
                }
            }
        }
    }

    #[test]
    fn test_confused_learner_gets_more_tokens() {
        let base = SignalSet::new(0.5, 0.5, 0.5);
        let confused = allocator().allocate(0.5, &base.clone().with_emotion(Emotion::Confused), ThinkingMode::Hybrid, Some(100_000));
        let confident = allocator().allocate(0.5, &base.with_emotion(Emotion::Confident), ThinkingMode::Hybrid, Some(100_000));
        assert!((confused.emotion_multiplier - 1.5).abs() < 1e-9);
        assert!(confused.total_tokens > confident.total_tokens);
    }

    #[test]
    fn test_floor_applies_when_ceiling_allows() {
        let budget = allocator().allocate(
            0.0,
            &SignalSet::new(1.0, 1.0, 0.0),
            ThinkingMode::System1,
            Some(100_000),
        );
        assert!(budget.total_tokens >= 500);
    }

    #[test]
    fn test_small_ceiling_caps_total() {
        let budget = allocator().allocate(0.9, &neutral(), ThinkingMode::System2, Some(300));
        assert_eq!(budget.total_tokens, 270);
        assert_invariant(&budget, 300);
    }

    #[test]
    fn test_missing_ceiling_uses_fallback() {
        let none = allocator().allocate(1.0, &SignalSet::new(0.0, 0.0, 0.0), ThinkingMode::System2, None);
        let zero = allocator().allocate(1.0, &SignalSet::new(0.0, 0.0, 0.0), ThinkingMode::System2, Some(0));
        assert_eq!(none.provider_max_tokens, 4096);
        assert_eq!(zero.provider_max_tokens, 4096);
        assert!(none.total_tokens <= 3686);
        assert!(!none.fallback);
    }

    #[test]
    fn test_invalid_signal_falls_back() {
        let budget = allocator().allocate(0.5, &SignalSet::new(0.5, f64::NAN, 0.5), ThinkingMode::Hybrid, Some(8000));
        assert!(budget.fallback);
        assert_eq!(budget.mode, BudgetMode::Conservative);
        assert_eq!(budget.total_tokens, 2500);
        assert_eq!(budget.reasoning_tokens + budget.response_tokens, 2500);
        assert!(allocator()
            .try_allocate(1.5, &neutral(), ThinkingMode::Hybrid, Some(8000))
            .is_err());
    }

    #[test]
    fn test_fallback_respects_ceiling() {
        let budget = TokenBudget::fallback(ThinkingMode::Hybrid, Some(1000), &BudgetConfig::default());
        assert_eq!(budget.total_tokens, 900);
        assert_invariant(&budget, 1000);
    }

    #[test]
    fn test_records_thinking_mode() {
        let budget = allocator().allocate(0.8, &neutral(), ThinkingMode::System2, Some(8000));
        assert_eq!(budget.thinking_mode, ThinkingMode::System2);
        assert!((budget.complexity_factor - 1.12).abs() < 1e-9);
    }
}

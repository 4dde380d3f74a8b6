//! Dual-process mode selection.
//!
//! Rules are evaluated in a fixed priority order:
//! 1. trivial query and confident learner: System 1
//! 2. moderate query and high blended readiness score: System 1
//! 3. high complexity: System 2, confidence growing with complexity
//! 4. otherwise: Hybrid
//!
//! A requested mode is echoed in the rationale but never overrides the
//! computed decision.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SignalSet, ThinkingMode};
use crate::config::DecisionConfig;
use crate::error::{ensure_unit, ReasoningResult};

/// Outcome of thinking-mode selection. Created once per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingDecision {
    pub mode: ThinkingMode,
    /// Confidence in the decision (0.0-1.0)
    pub confidence: f64,
    /// Human-readable explanation referencing the inputs
    pub rationale: String,
    pub complexity_score: f64,
    pub emotion_factor: f64,
    /// 1 - cognitive load
    pub load_factor: f64,
    pub readiness_factor: f64,
    /// Weighted blend used by the fast-path rule
    pub overall_score: f64,
    pub estimated_time_ms: f64,
    pub estimated_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_mode: Option<ThinkingMode>,
    /// True when this is the fail-safe decision
    #[serde(default)]
    pub fallback: bool,
}

impl ThinkingDecision {
    /// Fail-safe decision: Hybrid with confidence 0.5.
    pub fn fallback(
        complexity: f64,
        requested_mode: Option<ThinkingMode>,
        reason: &str,
        config: &DecisionConfig,
    ) -> Self {
        let complexity = if complexity.is_finite() {
            complexity.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let (estimated_time_ms, estimated_tokens) =
            estimate_processing(ThinkingMode::Hybrid, complexity);
        Self {
            mode: ThinkingMode::Hybrid,
            confidence: config.fallback_confidence,
            rationale: format!("Fallback to Hybrid after decision failure: {}", reason),
            complexity_score: complexity,
            emotion_factor: 0.5,
            load_factor: 0.5,
            readiness_factor: 0.5,
            overall_score: 0.5,
            estimated_time_ms,
            estimated_tokens,
            requested_mode,
            fallback: true,
        }
    }
}

/// Chooses between fast, deliberate and hybrid thinking.
#[derive(Debug, Clone, Default)]
pub struct DualProcessEngine {
    config: DecisionConfig,
}

impl DualProcessEngine {
    /// Create an engine with the given thresholds.
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    /// Access the thresholds.
    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Decide, falling back to Hybrid/0.5 on invalid input.
    pub fn decide(
        &self,
        complexity: f64,
        signals: &SignalSet,
        requested_mode: Option<ThinkingMode>,
    ) -> ThinkingDecision {
        match self.try_decide(complexity, signals, requested_mode) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    error = %e,
                    complexity = complexity,
                    emotion_factor = signals.emotion_factor,
                    cognitive_load = signals.cognitive_load,
                    readiness = signals.readiness,
                    "Thinking-mode decision failed, using fallback"
                );
                ThinkingDecision::fallback(complexity, requested_mode, &e.to_string(), &self.config)
            }
        }
    }

    /// Decide, rejecting NaN or out-of-range inputs.
    pub fn try_decide(
        &self,
        complexity: f64,
        signals: &SignalSet,
        requested_mode: Option<ThinkingMode>,
    ) -> ReasoningResult<ThinkingDecision> {
        let complexity = ensure_unit("complexity", complexity)?;
        let emotion_factor = ensure_unit("emotion_factor", signals.emotion_factor)?;
        let load = ensure_unit("cognitive_load", signals.cognitive_load)?;
        let readiness = ensure_unit("readiness", signals.readiness)?;

        let c = &self.config;
        let load_factor = 1.0 - load;
        let overall_score = (1.0 - complexity) * c.simplicity_weight
            + emotion_factor * c.emotion_weight
            + load_factor * c.load_weight
            + readiness * c.readiness_weight;

        let (mode, confidence, mut rationale) = if complexity < c.trivial_complexity
            && emotion_factor >= c.confident_emotion
        {
            (
                ThinkingMode::System1,
                c.trivial_confidence,
                format!(
                    "Trivial query (complexity={:.2}) and confident learner (emotion={:.2}), using fast System 1",
                    complexity, emotion_factor
                ),
            )
        } else if complexity < c.moderate_complexity && overall_score > c.fast_path_score {
            (
                ThinkingMode::System1,
                c.fast_path_confidence,
                format!(
                    "Simple query (complexity={:.2}) and ready learner (score={:.2}, load={:.2}, readiness={:.2}), using fast System 1",
                    complexity, overall_score, load, readiness
                ),
            )
        } else if complexity > c.high_complexity {
            (
                ThinkingMode::System2,
                self.deliberate_confidence(complexity),
                format!(
                    "High complexity ({:.2}) requires deep reasoning (System 2)",
                    complexity
                ),
            )
        } else {
            (
                ThinkingMode::Hybrid,
                self.hybrid_confidence(complexity),
                format!(
                    "Moderate conditions (complexity={:.2}, score={:.2}, emotion={:.2}, load={:.2}), using adaptive Hybrid mode",
                    complexity, overall_score, emotion_factor, load
                ),
            )
        };

        if let Some(requested) = requested_mode {
            if requested == mode {
                rationale.push_str(&format!("; matches requested mode {}", requested));
            } else {
                rationale.push_str(&format!(
                    "; requested mode {} noted but computed mode {} retained",
                    requested, mode
                ));
            }
        }

        let (estimated_time_ms, estimated_tokens) = estimate_processing(mode, complexity);

        debug!(
            mode = %mode,
            confidence = confidence,
            complexity = complexity,
            overall_score = overall_score,
            "Thinking mode selected"
        );

        Ok(ThinkingDecision {
            mode,
            confidence,
            rationale,
            complexity_score: complexity,
            emotion_factor,
            load_factor,
            readiness_factor: readiness,
            overall_score,
            estimated_time_ms,
            estimated_tokens,
            requested_mode,
            fallback: false,
        })
    }

    /// Grows linearly from the minimum at the high threshold to the
    /// maximum at complexity 1.
    fn deliberate_confidence(&self, complexity: f64) -> f64 {
        let c = &self.config;
        let span = (1.0 - c.high_complexity).max(f64::EPSILON);
        let t = ((complexity - c.high_complexity) / span).clamp(0.0, 1.0);
        c.deliberate_confidence_min + t * (c.deliberate_confidence_max - c.deliberate_confidence_min)
    }

    /// Highest at the centre of the hybrid band, lowest at its edges.
    fn hybrid_confidence(&self, complexity: f64) -> f64 {
        let c = &self.config;
        let centre = (c.moderate_complexity + c.high_complexity) / 2.0;
        let half_width = ((c.high_complexity - c.moderate_complexity) / 2.0).max(f64::EPSILON);
        let distance = ((complexity - centre).abs() / half_width).clamp(0.0, 1.0);
        c.hybrid_confidence_max - distance * (c.hybrid_confidence_max - c.hybrid_confidence_min)
    }
}

/// Expected latency and tokens for a mode, linear in complexity.
fn estimate_processing(mode: ThinkingMode, complexity: f64) -> (f64, u32) {
    let (time_base, time_span, tokens_base, tokens_span) = match mode {
        ThinkingMode::System1 => (500.0, 1000.0, 300.0, 700.0),
        ThinkingMode::Hybrid => (1500.0, 3000.0, 800.0, 1700.0),
        ThinkingMode::System2 => (3000.0, 5000.0, 1500.0, 3000.0),
    };
    (
        time_base + complexity * time_span,
        (tokens_base + complexity * tokens_span) as u32,
    )
}

//! Metacognitive controller.
//!
//! Wires the stages in strict order (complexity, decision, budget, search)
//! and turns every stage error into its documented fallback, so callers
//! always receive a complete [`ReasoningOutcome`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    BudgetAllocator, CancellationFlag, CognitiveState, ComplexityAnalyzer, DualProcessEngine,
    EmotionState, MctsReasoningEngine, ReasoningChain, SearchTermination, SignalCorrection,
    SignalSet, ThinkingDecision, ThinkingMode, TokenBudget,
};
use crate::config::ReasoningConfig;
use crate::generation::TextGenerator;

/// Input to one controller invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub query: String,
    #[serde(default)]
    pub emotion: EmotionState,
    #[serde(default)]
    pub cognitive: CognitiveState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_mode: Option<ThinkingMode>,
    /// Hard upper bound on tokens for this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_max_tokens: Option<u32>,
}

impl ReasoningRequest {
    /// Create a request with neutral signals.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            emotion: EmotionState::default(),
            cognitive: CognitiveState::default(),
            requested_mode: None,
            provider_max_tokens: None,
        }
    }

    pub fn with_emotion(mut self, emotion: EmotionState) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_cognitive(mut self, cognitive: CognitiveState) -> Self {
        self.cognitive = cognitive;
        self
    }

    pub fn with_requested_mode(mut self, mode: ThinkingMode) -> Self {
        self.requested_mode = Some(mode);
        self
    }

    pub fn with_provider_max_tokens(mut self, max_tokens: u32) -> Self {
        self.provider_max_tokens = Some(max_tokens);
        self
    }
}

/// Pipeline stage, used to attribute fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStage {
    Complexity,
    Decision,
    Budget,
    Search,
}

impl std::fmt::Display for ReasoningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReasoningStage::Complexity => "complexity",
            ReasoningStage::Decision => "decision",
            ReasoningStage::Budget => "budget",
            ReasoningStage::Search => "search",
        };
        write!(f, "{}", name)
    }
}

/// A stage that degraded to its safe default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFallback {
    pub stage: ReasoningStage,
    pub reason: String,
}

/// Result of the pure, non-suspending stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPlan {
    pub complexity_score: f64,
    /// Signals after normalization
    pub signals: SignalSet,
    pub signal_corrections: Vec<SignalCorrection>,
    pub decision: ThinkingDecision,
    pub budget: TokenBudget,
    pub fallbacks: Vec<StageFallback>,
}

/// Full result of one controller invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutcome {
    pub complexity_score: f64,
    pub signals: SignalSet,
    pub signal_corrections: Vec<SignalCorrection>,
    pub decision: ThinkingDecision,
    pub budget: TokenBudget,
    pub chain: ReasoningChain,
    /// Stages that fell back, in pipeline order
    pub fallbacks: Vec<StageFallback>,
}

/// Runs complexity analysis, mode selection and budgeting. Performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct ReasoningPlanner {
    analyzer: ComplexityAnalyzer,
    dual_process: DualProcessEngine,
    allocator: BudgetAllocator,
    default_provider_max_tokens: Option<u32>,
}

impl ReasoningPlanner {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            analyzer: ComplexityAnalyzer::new(config.complexity.clone()),
            dual_process: DualProcessEngine::new(config.decision.clone()),
            allocator: BudgetAllocator::new(config.budget.clone()),
            default_provider_max_tokens: config.default_provider_max_tokens,
        }
    }

    /// Run the pure stages for `request`.
    pub fn plan(&self, request: &ReasoningRequest) -> ReasoningPlan {
        let mut fallbacks = Vec::new();
        let provider_max_tokens = request
            .provider_max_tokens
            .or(self.default_provider_max_tokens);
        let (signals, signal_corrections) =
            SignalSet::from_states(&request.emotion, &request.cognitive).sanitized();

        let mut complexity_score = self.analyzer.analyze(&request.query);
        if !complexity_score.is_finite() {
            warn!(
                complexity = complexity_score,
                "Complexity analysis produced a non-finite score, using 0.5"
            );
            fallbacks.push(StageFallback {
                stage: ReasoningStage::Complexity,
                reason: format!("non-finite complexity score {}", complexity_score),
            });
            complexity_score = 0.5;
        }

        let decision = match self.dual_process.try_decide(
            complexity_score,
            &signals,
            request.requested_mode,
        ) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, stage = %ReasoningStage::Decision, "Stage failed, using fallback");
                fallbacks.push(StageFallback {
                    stage: ReasoningStage::Decision,
                    reason: e.to_string(),
                });
                ThinkingDecision::fallback(
                    complexity_score,
                    request.requested_mode,
                    &e.to_string(),
                    self.dual_process.config(),
                )
            }
        };

        let budget = match self.allocator.try_allocate(
            complexity_score,
            &signals,
            decision.mode,
            provider_max_tokens,
        ) {
            Ok(budget) => budget,
            Err(e) => {
                warn!(error = %e, stage = %ReasoningStage::Budget, "Stage failed, using fallback");
                fallbacks.push(StageFallback {
                    stage: ReasoningStage::Budget,
                    reason: e.to_string(),
                });
                TokenBudget::fallback(
                    decision.mode,
                    provider_max_tokens,
                    self.allocator.config(),
                )
            }
        };

        ReasoningPlan {
            complexity_score,
            signals,
            signal_corrections,
            decision,
            budget,
            fallbacks,
        }
    }
}

/// Orchestrates the full reasoning pipeline for one query at a time.
///
/// Holds only configuration and the generator handle; invocations share no
/// mutable state and may run concurrently.
pub struct MetacognitiveController {
    planner: ReasoningPlanner,
    engine: MctsReasoningEngine,
    max_iterations: usize,
}

impl MetacognitiveController {
    pub fn new(generator: Arc<dyn TextGenerator>, config: ReasoningConfig) -> Self {
        Self {
            planner: ReasoningPlanner::new(&config),
            max_iterations: config.search.max_iterations,
            engine: MctsReasoningEngine::new(generator, config.search),
        }
    }

    /// Access the planner (pure stages only).
    pub fn planner(&self) -> &ReasoningPlanner {
        &self.planner
    }

    /// Run every stage. Never fails.
    pub async fn run(&self, request: ReasoningRequest) -> ReasoningOutcome {
        self.run_with_cancel(request, &CancellationFlag::new()).await
    }

    /// Run every stage, stopping the search early if `cancel` is set.
    pub async fn run_with_cancel(
        &self,
        request: ReasoningRequest,
        cancel: &CancellationFlag,
    ) -> ReasoningOutcome {
        let ReasoningPlan {
            complexity_score,
            signals,
            signal_corrections,
            decision,
            budget,
            mut fallbacks,
        } = self.planner.plan(&request);

        info!(
            complexity = complexity_score,
            mode = %decision.mode,
            confidence = decision.confidence,
            budget_mode = %budget.mode,
            total_tokens = budget.total_tokens,
            reasoning_tokens = budget.reasoning_tokens,
            "Reasoning plan ready"
        );

        let chain = self
            .engine
            .generate_with_cancel(
                &request.query,
                &budget,
                decision.mode,
                complexity_score,
                self.max_iterations,
                cancel,
            )
            .await;

        if chain.stats.termination == SearchTermination::ProviderFailures {
            fallbacks.push(StageFallback {
                stage: ReasoningStage::Search,
                reason: format!(
                    "{} of {} expansion attempts failed; chain has {} steps",
                    chain.stats.failed_expansions,
                    chain.stats.expansion_attempts,
                    chain.len()
                ),
            });
        }

        ReasoningOutcome {
            complexity_score,
            signals,
            signal_corrections,
            decision,
            budget,
            chain,
            fallbacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::generation::{Generation, MockTextGenerator};
    use crate::reasoning::BudgetMode;

    fn step_generator() -> MockTextGenerator {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|req| {
            Ok(Generation::new(format!(
                "Because of the setup, step {} follows.",
                req.prompt.len() % 7
            ))
            .with_confidence(0.8))
        });
        mock
    }

    fn controller(mock: MockTextGenerator) -> MetacognitiveController {
        MetacognitiveController::new(Arc::new(mock), ReasoningConfig::default())
    }

    #[tokio::test]
    async fn test_trivial_query_skips_search() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);
        let outcome = controller(mock)
            .run(
                ReasoningRequest::new("What is 2+2?")
                    .with_emotion(EmotionState::new(0.9))
                    .with_cognitive(CognitiveState::new(0.2, 1.0))
                    .with_provider_max_tokens(8000),
            )
            .await;
        assert_eq!(outcome.decision.mode, ThinkingMode::System1);
        assert!(outcome.chain.is_empty());
        assert!(outcome.fallbacks.is_empty());
        assert!(outcome.budget.total_tokens <= 7200);
    }

    #[tokio::test]
    async fn test_out_of_range_signals_are_clamped_not_fatal() {
        let outcome = controller(step_generator())
            .run(
                ReasoningRequest::new("Explain how photosynthesis works at a molecular level")
                    .with_emotion(EmotionState::new(1.7))
                    .with_cognitive(CognitiveState::new(f64::NAN, -3.0)),
            )
            .await;
        assert_eq!(outcome.signals.emotion_factor, 1.0);
        assert_eq!(outcome.signals.cognitive_load, 0.5);
        assert_eq!(outcome.signals.readiness, 0.0);
        assert_eq!(outcome.signal_corrections.len(), 3);
        assert!(outcome.fallbacks.is_empty());
        assert!(!outcome.decision.fallback);
    }

    #[tokio::test]
    async fn test_provider_failures_are_recorded() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_| {
            Err(ProviderError::Unavailable {
                message: "offline".to_string(),
            })
        });
        let outcome = controller(mock)
            .run(ReasoningRequest::new(
                "Explain how photosynthesis works at a molecular level",
            ))
            .await;
        assert_ne!(outcome.decision.mode, ThinkingMode::System1);
        assert!(outcome.chain.is_empty());
        assert_eq!(outcome.chain.total_confidence, 0.0);
        assert_eq!(outcome.fallbacks.len(), 1);
        assert_eq!(outcome.fallbacks[0].stage, ReasoningStage::Search);
    }

    #[test]
    fn test_planner_honors_provider_ceiling() {
        let plan = ReasoningPlanner::default().plan(
            &ReasoningRequest::new("Prove the theorem about entropy and the integral")
                .with_provider_max_tokens(1000),
        );
        assert!(plan.budget.total_tokens <= 900);
        assert!(
            plan.budget.reasoning_tokens + plan.budget.response_tokens
                <= plan.budget.total_tokens
        );
    }

    #[test]
    fn test_planner_uses_configured_default_ceiling() {
        let config = ReasoningConfig {
            default_provider_max_tokens: Some(600),
            ..Default::default()
        };
        let planner = ReasoningPlanner::new(&config);
        let plan = planner.plan(&ReasoningRequest::new("Explain entropy"));
        assert_eq!(plan.budget.provider_max_tokens, 600);
        assert!(plan.budget.total_tokens <= 540);

        let plan = planner.plan(&ReasoningRequest::new("Explain entropy").with_provider_max_tokens(8000));
        assert_eq!(plan.budget.provider_max_tokens, 8000);
    }

    #[test]
    fn test_planner_complexity_fallback_is_recorded() {
        let config = ReasoningConfig {
            complexity: crate::config::ComplexityConfig {
                length_weight: f64::NAN,
                ..Default::default()
            },
            ..Default::default()
        };
        let plan = ReasoningPlanner::new(&config).plan(&ReasoningRequest::new("hello world"));
        assert_eq!(plan.complexity_score, 0.5);
        assert_eq!(plan.fallbacks[0].stage, ReasoningStage::Complexity);
        assert_eq!(plan.budget.mode, BudgetMode::Balanced);
    }

    #[test]
    fn test_request_serde_defaults() {
        let request: ReasoningRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(request.emotion.emotion_factor, 0.5);
        assert_eq!(request.cognitive.readiness, 0.5);
        assert_eq!(request.requested_mode, None);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ReasoningStage::Budget.to_string(), "budget");
        let json = serde_json::to_string(&ReasoningStage::Search).unwrap();
        assert_eq!(json, "\"search\"");
    }
}

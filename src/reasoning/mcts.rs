//! Monte-Carlo tree search over generated reasoning steps.
//!
//! Each iteration selects a node by UCB, asks the [`TextGenerator`] for one
//! next step, scores it, and backpropagates the score to the root. Failed
//! or timed-out generations are retried a bounded number of times and then
//! abandoned without touching the tree. The best path is always extracted,
//! whatever stopped the search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::search_tree::{NewStep, NodeId, SearchTree};
use super::{
    mean_confidence, strategy_distribution, ReasoningChain, ReasoningStep, ReasoningStrategy,
    SearchStats, SearchTermination, ThinkingMode, TokenBudget,
};
use crate::config::SearchConfig;
use crate::error::ProviderError;
use crate::generation::{Generation, GenerationRequest, TextGenerator};
use crate::prompts::build_expansion_prompt;

/// Cooperative cancellation signal, checked between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable bookkeeping for one search run.
#[derive(Debug, Default)]
struct SearchCounters {
    iterations: u32,
    attempts: u32,
    failures: u32,
    consecutive_failed_rounds: u32,
    tokens_used: u32,
}

/// Generates reasoning chains by tree search.
pub struct MctsReasoningEngine {
    generator: Arc<dyn TextGenerator>,
    config: SearchConfig,
}

impl MctsReasoningEngine {
    /// Create an engine backed by `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>, config: SearchConfig) -> Self {
        Self { generator, config }
    }

    /// Access the search parameters.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Planned chain length for a mode. System 1 plans no chain.
    pub fn target_depth(&self, mode: ThinkingMode, complexity: f64) -> usize {
        let c = &self.config;
        match mode {
            ThinkingMode::System1 => 0,
            ThinkingMode::Hybrid => c.hybrid_depth.max(1),
            ThinkingMode::System2 => {
                let complexity = if complexity.is_finite() {
                    complexity.clamp(0.0, 1.0)
                } else {
                    0.5
                };
                let span = c.deliberate_max_depth.saturating_sub(c.deliberate_min_depth) as f64;
                (c.deliberate_min_depth as f64 + span * complexity).round().max(1.0) as usize
            }
        }
    }

    /// Generate a chain. Never fails; degraded searches return shorter
    /// (possibly empty) chains.
    pub async fn generate(
        &self,
        query: &str,
        budget: &TokenBudget,
        mode: ThinkingMode,
        complexity: f64,
        max_iterations: usize,
    ) -> ReasoningChain {
        self.generate_with_cancel(
            query,
            budget,
            mode,
            complexity,
            max_iterations,
            &CancellationFlag::new(),
        )
        .await
    }

    /// Generate a chain, stopping early if `cancel` is set. The best path
    /// found so far is returned on cancellation.
    pub async fn generate_with_cancel(
        &self,
        query: &str,
        budget: &TokenBudget,
        mode: ThinkingMode,
        complexity: f64,
        max_iterations: usize,
        cancel: &CancellationFlag,
    ) -> ReasoningChain {
        if mode == ThinkingMode::System1 {
            debug!("System 1 selected, skipping search");
            return ReasoningChain::empty(query, mode, complexity, budget.reasoning_tokens);
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        let target_depth = self.target_depth(mode, complexity);
        let iteration_budget =
            max_iterations.min(target_depth.saturating_mul(self.config.branching_factor.max(1)));

        info!(
            mode = %mode,
            complexity = complexity,
            target_depth = target_depth,
            iteration_budget = iteration_budget,
            reasoning_tokens = budget.reasoning_tokens,
            "Starting reasoning search"
        );

        let mut tree = SearchTree::new();
        let mut counters = SearchCounters::default();
        let mut remaining = budget.reasoning_tokens;

        let termination = loop {
            if cancel.is_cancelled() {
                warn!(
                    iterations = counters.iterations,
                    "Reasoning search cancelled, returning best path so far"
                );
                break SearchTermination::Cancelled;
            }
            if counters.iterations as usize >= iteration_budget {
                break SearchTermination::IterationsExhausted;
            }
            if remaining < self.config.min_step_tokens.max(1) {
                info!(
                    remaining = remaining,
                    iterations = counters.iterations,
                    "Reasoning token budget exhausted"
                );
                break SearchTermination::BudgetExhausted;
            }

            let leaf = self.select(&tree, target_depth);
            if tree.node(leaf).depth >= target_depth {
                break SearchTermination::Converged;
            }

            let previous: Vec<&str> = tree
                .path_to(leaf)
                .into_iter()
                .map(|id| tree.node(id).text.as_str())
                .collect();
            let prompt = build_expansion_prompt(query, &previous, target_depth);
            let request_tokens = remaining.min(self.config.max_step_tokens.max(1));

            let Some((generation, elapsed_ms)) =
                self.expand(&prompt, request_tokens, &mut counters).await
            else {
                counters.consecutive_failed_rounds += 1;
                if counters.consecutive_failed_rounds >= self.config.max_consecutive_failures.max(1)
                {
                    warn!(
                        failed_rounds = counters.consecutive_failed_rounds,
                        failed_expansions = counters.failures,
                        "Too many failed expansions, ending search"
                    );
                    break SearchTermination::ProviderFailures;
                }
                continue;
            };
            counters.consecutive_failed_rounds = 0;

            let consumed = generation
                .tokens_used
                .unwrap_or_else(|| estimate_tokens(&generation.content))
                .clamp(1, request_tokens);
            remaining = remaining.saturating_sub(consumed);
            counters.tokens_used += consumed;

            let child = tree.add_child(
                leaf,
                NewStep {
                    text: generation.content.trim().to_string(),
                    processing_time_ms: elapsed_ms,
                },
            );
            let value = self.simulate(&tree, child, generation.confidence, target_depth);
            tree.backpropagate(child, value);
            counters.iterations += 1;

            debug!(
                iteration = counters.iterations,
                depth = tree.node(child).depth,
                value = value,
                tokens = consumed,
                remaining = remaining,
                "Expanded reasoning node"
            );

            if tree.node(child).depth >= target_depth {
                break SearchTermination::Converged;
            }
        };

        let steps = extract_steps(&tree);
        let total_confidence = mean_confidence(&steps);
        let conclusion = steps.last().map(|s| s.text.clone());
        let distribution = strategy_distribution(&steps);

        info!(
            steps = steps.len(),
            total_confidence = total_confidence,
            termination = %termination,
            iterations = counters.iterations,
            failed_expansions = counters.failures,
            tokens_used = counters.tokens_used,
            "Reasoning search finished"
        );

        ReasoningChain {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            steps,
            total_confidence,
            strategy_distribution: distribution,
            thinking_mode: mode,
            complexity_score: complexity,
            conclusion,
            token_budget_allocated: budget.reasoning_tokens,
            token_budget_used: counters.tokens_used,
            started_at,
            completed_at: Utc::now(),
            processing_time_ms: clock.elapsed().as_millis() as u64,
            stats: SearchStats {
                iterations_performed: counters.iterations,
                expansion_attempts: counters.attempts,
                failed_expansions: counters.failures,
                nodes_explored: tree.explored(),
                root_visits: tree.node(tree.root()).visit_count,
                target_depth,
                termination,
            },
        }
    }

    /// Descend by UCB until a node that can take another child.
    fn select(&self, tree: &SearchTree, target_depth: usize) -> NodeId {
        let c = &self.config;
        let mut current = tree.root();
        loop {
            if tree.node(current).depth >= target_depth
                || tree.has_capacity(current, c.branching_factor.max(1), c.widen_threshold, target_depth)
            {
                return current;
            }
            match tree.best_child_by_ucb(current, c.exploration_constant) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// One expansion round: up to `1 + expansion_retries` generator calls,
    /// each under the expansion timeout.
    async fn expand(
        &self,
        prompt: &str,
        max_tokens: u32,
        counters: &mut SearchCounters,
    ) -> Option<(Generation, u64)> {
        let timeout_ms = self.config.expansion_timeout_ms;
        for attempt in 0..=self.config.expansion_retries {
            counters.attempts += 1;
            let start = Instant::now();
            let request = GenerationRequest::reasoning(prompt, max_tokens);

            let error = match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                self.generator.generate(request),
            )
            .await
            {
                Ok(Ok(generation)) if !generation.content.trim().is_empty() => {
                    return Some((generation, start.elapsed().as_millis() as u64));
                }
                Ok(Ok(_)) => ProviderError::EmptyContent,
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout { timeout_ms },
            };

            counters.failures += 1;
            warn!(
                error = %error,
                attempt = attempt + 1,
                max_tokens = max_tokens,
                "Expansion failed"
            );
        }
        None
    }

    /// Score a new node in [0, 1].
    ///
    /// The heuristic rewards progress toward the target depth, developed
    /// step text, and strategy diversity along the path. A model-reported
    /// confidence, when present, dominates the blend.
    fn simulate(
        &self,
        tree: &SearchTree,
        id: NodeId,
        confidence: Option<f64>,
        target_depth: usize,
    ) -> f64 {
        let node = tree.node(id);
        let progress = (node.depth as f64 / target_depth.max(1) as f64).min(1.0);
        let words = node.text.split_whitespace().count() as f64;
        let development = if self.config.step_length_saturation_words > 0.0 {
            (words / self.config.step_length_saturation_words).min(1.0)
        } else {
            1.0
        };
        let mut strategies: Vec<ReasoningStrategy> = tree
            .path_to(id)
            .into_iter()
            .map(|n| tree.node(n).strategy)
            .collect();
        strategies.sort();
        strategies.dedup();
        let diversity = strategies.len() as f64 / ReasoningStrategy::COUNT as f64;

        let heuristic = 0.4 * progress + 0.4 * development + 0.2 * diversity;

        let value = match confidence {
            Some(conf) if conf.is_finite() => {
                let w = self.config.confidence_weight.clamp(0.0, 1.0);
                w * conf.clamp(0.0, 1.0) + (1.0 - w) * heuristic
            }
            _ => heuristic,
        };
        value.clamp(0.0, 1.0)
    }
}

/// Rough token count for backends that report no usage.
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// Turn the best path into 1-indexed steps.
fn extract_steps(tree: &SearchTree) -> Vec<ReasoningStep> {
    tree.best_path()
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let node = tree.node(id);
            let mean_value = node.mean_value();
            ReasoningStep {
                id: uuid::Uuid::new_v4().to_string(),
                index: i + 1,
                text: node.text.clone(),
                strategy: node.strategy,
                confidence: mean_value,
                visit_count: node.visit_count,
                mean_value,
                processing_time_ms: node.processing_time_ms,
                timestamp: node.created_at,
            }
        })
        .collect()
}

//! The reasoning core.
//!
//! Stages run strictly in order for each query:
//! - [`ComplexityAnalyzer`]: query text to a complexity score in [0, 1]
//! - [`DualProcessEngine`]: picks a [`ThinkingMode`] with confidence and rationale
//! - [`BudgetAllocator`]: sizes the reasoning/response [`TokenBudget`]
//! - [`MctsReasoningEngine`]: searches for an ordered [`ReasoningChain`]
//! - [`MetacognitiveController`]: wires the stages and normalizes failures
//!
//! Only the search suspends (it awaits the text generator); every other
//! stage is a pure, synchronous computation.

mod budget;
mod chain;
mod complexity;
mod controller;
mod dual_process;
mod mcts;
mod search_tree;
mod signals;

pub use budget::*;
pub use chain::*;
pub use complexity::*;
pub use controller::*;
pub use dual_process::*;
pub use mcts::*;
pub use signals::*;

use serde::{Deserialize, Serialize};

/// Thinking mode selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingMode {
    /// Fast answer, no explicit chain.
    System1,
    /// Full deliberate chain.
    System2,
    /// Shortened chain.
    Hybrid,
}

impl ThinkingMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkingMode::System1 => "system1",
            ThinkingMode::System2 => "system2",
            ThinkingMode::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for ThinkingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ThinkingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system1" | "fast" => Ok(ThinkingMode::System1),
            "system2" | "deliberate" => Ok(ThinkingMode::System2),
            "hybrid" => Ok(ThinkingMode::Hybrid),
            _ => Err(format!("Unknown thinking mode: {}", s)),
        }
    }
}

//! # Deep Thinking
//!
//! The reasoning core of a tutoring assistant: it decides how much to think
//! about a learner's query, sizes a token budget for it, and searches for an
//! ordered chain of intermediate reasoning steps before the answer is
//! written.
//!
//! ## Pipeline
//!
//! ```text
//! query + signals → ComplexityAnalyzer → DualProcessEngine → BudgetAllocator
//!                                                                  ↓
//!                     ReasoningOutcome ← MctsReasoningEngine ← TokenBudget
//!                                              ↓
//!                                        TextGenerator (e.g. Langbase Pipes)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use deep_thinking::config::Config;
//! use deep_thinking::langbase::{LangbaseClient, LangbaseGenerator};
//! use deep_thinking::reasoning::{MetacognitiveController, ReasoningRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let generator = Arc::new(LangbaseGenerator::new(client, &config.pipes.reasoning));
//!     let controller = MetacognitiveController::new(generator, config.reasoning);
//!     let outcome = controller.run(ReasoningRequest::new("Why is the sky blue?")).await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```

/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// The text-generation capability consumed by the search.
pub mod generation;
/// Langbase API client and step generator.
pub mod langbase;
/// Prompts for step generation.
pub mod prompts;
/// Complexity analysis, mode selection, budgeting and tree search.
pub mod reasoning;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use reasoning::{MetacognitiveController, ReasoningOutcome, ReasoningRequest};

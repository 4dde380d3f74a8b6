//! Langbase Pipes backend for step generation.
//!
//! [`LangbaseClient`] speaks the HTTP API; [`LangbaseGenerator`] adapts it to
//! the [`crate::generation::TextGenerator`] capability used by the search.

mod client;
mod generator;
mod types;


pub use client::LangbaseClient;
pub use generator::LangbaseGenerator;
pub use types::{
    CreatePipeResponse, Message, MessageRole, PipeRequest, PipeResponse, RawResponse,
    StepPipeDefinition, StepResponse, Usage,
};

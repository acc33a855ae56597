//! Answer generation: prompt assembly and the query engine

pub mod prompt;
mod query;

pub use prompt::{PromptBuilder, ANSWER_TEMPLATE};
pub use query::{Answer, QueryEngine};

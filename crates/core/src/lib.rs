pub mod chunker;
pub mod content;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod io;
pub mod language;
pub mod llm_client;
pub mod parsing;
pub mod pipeline;
pub mod prompts;
pub mod questions;
pub mod session;
pub mod speech;
pub mod store;
pub mod topic;

pub use context::TrainerContext;
pub use language::Language;

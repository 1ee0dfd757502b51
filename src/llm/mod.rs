//! Generative extraction through a local instruction model

pub mod chunking;
pub mod extractor;
pub mod inference;
pub mod json_repair;
pub mod prompts;

pub use extractor::GenerativeExtractor;
pub use inference::{CandleGenerator, TextGenerator};

//! Resume parser library: structured candidate profiles from PDF and DOCX resumes

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod profile;

pub use config::{Config, Strategy};
pub use error::{Result, ResumeParserError};
pub use input::extract_lines;
pub use llm::{GenerativeExtractor, TextGenerator};
pub use pipeline::{ExtractionContext, FallbackExtractor, ResumeExtractor, RuleBasedExtractor};
pub use processing::blocks::BlockParsers;
pub use processing::identity::IdentityExtractor;
pub use processing::sections::{segment, Sections};
pub use processing::skills::SkillEngine;
pub use processing::vocabulary::KeywordDictionary;
pub use profile::{ResumeProfile, WireProfile};

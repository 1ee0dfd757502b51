//! Error handling for the resume parser

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeParserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Document read error: {0}")]
    DocumentRead(String),

    #[error("Embedding generation error: {0}")]
    Embedding(String),

    #[error("Named-entity recognition error: {0}")]
    Ner(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Model output is not valid JSON after repair: {0}")]
    JsonRepair(String),

    #[error("Model loading error: {0}")]
    ModelLoading(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Keyword vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Extraction context is not initialized")]
    NotInitialized,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ResumeParserError>;

/// Convert anyhow errors (model2vec-rs) to our custom error type
impl From<anyhow::Error> for ResumeParserError {
    fn from(err: anyhow::Error) -> Self {
        ResumeParserError::Embedding(err.to_string())
    }
}

/// Convert candle core errors to our custom error type
impl From<candle_core::Error> for ResumeParserError {
    fn from(err: candle_core::Error) -> Self {
        ResumeParserError::ModelError(err.to_string())
    }
}

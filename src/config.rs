//! Configuration management for the resume parser

use crate::error::{Result, ResumeParserError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub extraction: ExtractionConfig,
    pub skills: SkillConfig,
    pub generative: GenerativeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    /// Model2Vec embedding model used for keyphrases and semantic similarity
    pub embedding_model: Option<String>,
    /// Token-classification model tried first for names and skill entities
    pub ner_model: Option<String>,
    /// Second token-classification model, only consulted for the candidate name
    pub secondary_ner_model: Option<String>,
    /// Causal LM driving the generative extraction path
    pub generator_model: Option<String>,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub model_type: ModelType,
    pub size_mb: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    Embedding,
    Ner,
    LLM,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RuleBased,
    Generative,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub strategy: Strategy,
    /// Leading lines searched for email, phone, contact links and location
    pub header_lines: usize,
    /// Leading lines searched by the capitalised-name heuristic
    pub name_scan_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Flat keyword file (one term per line, or CSV with a header row)
    pub vocabulary_path: Option<PathBuf>,
    pub similarity_threshold: f32,
    pub keyphrase_top_n: usize,
    pub keyphrase_diversity: f32,
    pub max_ngram: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub max_tokens: usize,
    pub seed: u64,
    /// Experience units per chunk in the chunked fallback
    pub chunk_size: usize,
    /// Pause between sequential model calls in the chunked fallback
    pub rate_limit_ms: u64,
    /// Head size used when the document has no experience heading
    pub head_line_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".resume-parser")
            .join("models");

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: Some("minishlab/potion-base-8M".to_string()),
                ner_model: Some("dslim/bert-base-NER".to_string()),
                secondary_ner_model: None,
                generator_model: Some("microsoft/Phi-3-mini-4k-instruct".to_string()),
                available_models: vec![
                    AvailableModel {
                        name: "potion-base-8M".to_string(),
                        repo_id: "minishlab/potion-base-8M".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 33,
                        description: "Fast Model2Vec static embeddings".to_string(),
                    },
                    AvailableModel {
                        name: "m2v-base".to_string(),
                        repo_id: "minishlab/M2V_base_output".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 90,
                        description: "Model2Vec base embeddings model".to_string(),
                    },
                    AvailableModel {
                        name: "bert-base-ner".to_string(),
                        repo_id: "dslim/bert-base-NER".to_string(),
                        model_type: ModelType::Ner,
                        size_mb: 430,
                        description: "BERT token classifier for PER/ORG/LOC/MISC".to_string(),
                    },
                    AvailableModel {
                        name: "bert-large-ner".to_string(),
                        repo_id: "dbmdz/bert-large-cased-finetuned-conll03-english".to_string(),
                        model_type: ModelType::Ner,
                        size_mb: 1330,
                        description: "Larger CoNLL-03 token classifier".to_string(),
                    },
                    AvailableModel {
                        name: "phi-3-mini".to_string(),
                        repo_id: "microsoft/Phi-3-mini-4k-instruct".to_string(),
                        model_type: ModelType::LLM,
                        size_mb: 7600,
                        description: "Small instruction model for JSON extraction".to_string(),
                    },
                    AvailableModel {
                        name: "llama-3.2-3b".to_string(),
                        repo_id: "meta-llama/Llama-3.2-3B-Instruct".to_string(),
                        model_type: ModelType::LLM,
                        size_mb: 6400,
                        description: "Llama instruction model".to_string(),
                    },
                ],
            },
            extraction: ExtractionConfig {
                strategy: Strategy::RuleBased,
                header_lines: 10,
                name_scan_lines: 5,
            },
            skills: SkillConfig {
                vocabulary_path: None,
                similarity_threshold: 0.85,
                keyphrase_top_n: 10,
                keyphrase_diversity: 0.7,
                max_ngram: 3,
            },
            generative: GenerativeConfig {
                temperature: 0.1,
                top_p: None,
                max_tokens: 1024,
                seed: 42,
                chunk_size: 3,
                rate_limit_ms: 1000,
                head_line_limit: 15,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
                pretty_json: true,
            },
        }
    }
}

impl GenerativeConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            ResumeParserError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ResumeParserError::Configuration(format!("Failed to serialize config: {}", e)))
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-parser")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.generative.chunk_size == 0 {
            return Err(ResumeParserError::Configuration(
                "generative.chunk_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.skills.similarity_threshold) {
            return Err(ResumeParserError::Configuration(format!(
                "skills.similarity_threshold must be within [0, 1], got {}",
                self.skills.similarity_threshold
            )));
        }
        if self.skills.max_ngram == 0 {
            return Err(ResumeParserError::Configuration(
                "skills.max_ngram must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn models_dir(&self) -> &PathBuf {
        &self.models.models_dir
    }

    pub fn get_model_by_name(&self, name: &str) -> Option<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .find(|m| m.name == name || m.repo_id == name)
    }

    pub fn list_models(&self, model_type: ModelType) -> Vec<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .filter(|m| m.model_type == model_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.strategy, Strategy::RuleBased);
        assert_eq!(config.skills.similarity_threshold, 0.85);
        assert_eq!(config.extraction.header_lines, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.extraction.strategy = Strategy::Auto;
        config.generative.chunk_size = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.extraction.strategy, Strategy::Auto);
        assert_eq!(loaded.generative.chunk_size, 5);
    }

    #[test]
    fn test_invalid_chunk_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.generative.chunk_size = 0;
        config.save_to(&path).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ResumeParserError::Configuration(_))
        ));
    }

    #[test]
    fn test_model_lookup_by_name_or_repo() {
        let config = Config::default();
        assert!(config.get_model_by_name("bert-base-ner").is_some());
        assert!(config.get_model_by_name("dslim/bert-base-NER").is_some());
        assert!(config.get_model_by_name("nope").is_none());
        assert_eq!(config.list_models(ModelType::Embedding).len(), 2);
    }
}

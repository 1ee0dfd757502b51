//! Named-entity recognition with a BERT token-classification head

use crate::error::{Result, ResumeParserError};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::Path;
use tokenizers::Tokenizer;

/// Sequence length accepted by BERT position embeddings
const MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Miscellaneous,
    Other(String),
}

impl EntityKind {
    /// Map a model label suffix (`PER`, `ORG`, ...) to a kind
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "PER" | "PERSON" => EntityKind::Person,
            "ORG" | "ORGANIZATION" => EntityKind::Organization,
            "LOC" | "LOCATION" | "GPE" => EntityKind::Location,
            "MISC" => EntityKind::Miscellaneous,
            other => EntityKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
}

/// Tags spans of text with entity kinds
pub trait TokenClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<Entity>>;

    fn name(&self) -> &str {
        "token-classifier"
    }
}

/// One classified word piece with its byte span in the source text
#[derive(Debug, Clone)]
pub(crate) struct TokenPrediction {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Group BIO-tagged word pieces into entities.
///
/// A piece continues the current entity when it carries the same type and
/// either has an `I-` prefix or is glued to the previous piece (a sub-word).
pub(crate) fn aggregate_entities(text: &str, predictions: &[TokenPrediction]) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut current: Option<(EntityKind, usize, usize)> = None;

    for prediction in predictions {
        let (prefix, label) = match prediction.label.split_once('-') {
            Some((prefix, label)) => (prefix, label),
            None => ("", prediction.label.as_str()),
        };

        if label == "O" || label.is_empty() {
            if let Some(entity) = current.take() {
                entities.push(entity);
            }
            continue;
        }

        let kind = EntityKind::from_label(label);
        match current.as_mut() {
            Some((current_kind, _, end))
                if *current_kind == kind && (prefix != "B" || prediction.start == *end) =>
            {
                *end = prediction.end;
            }
            _ => {
                if let Some(entity) = current.take() {
                    entities.push(entity);
                }
                current = Some((kind, prediction.start, prediction.end));
            }
        }
    }

    if let Some(entity) = current.take() {
        entities.push(entity);
    }

    entities
        .into_iter()
        .filter_map(|(kind, start, end)| {
            let span = text.get(start..end)?;
            let cleaned = span.replace("##", "").trim().to_string();
            if cleaned.is_empty() {
                return None;
            }
            Some(Entity {
                text: cleaned,
                kind,
                start,
                end,
            })
        })
        .collect()
}

pub struct BertTokenClassifier {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    id2label: HashMap<usize, String>,
    device: Device,
    name: String,
}

impl BertTokenClassifier {
    /// Load weights, tokenizer and label map from a downloaded model directory
    pub fn load(model_dir: &Path, device: Device) -> Result<Self> {
        log::info!("Loading token classifier from: {}", model_dir.display());

        let config_path = model_dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            ResumeParserError::ModelLoading(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        let config: BertConfig = serde_json::from_str(&config_str)?;
        let id2label = Self::parse_labels(&config_str)?;

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to load tokenizer: {}", e)))?;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: weights are read-only and were downloaded into our own models directory.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(model_dir.join("pytorch_model.bin"), DType::F32, &device)?
        };

        let model = BertModel::load(vb.clone(), &config)?;
        let classifier = candle_nn::linear(config.hidden_size, id2label.len(), vb.pp("classifier"))?;

        Ok(Self {
            model,
            classifier,
            tokenizer,
            id2label,
            device,
            name: model_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "bert-ner".to_string()),
        })
    }

    fn parse_labels(config_str: &str) -> Result<HashMap<usize, String>> {
        let value: serde_json::Value = serde_json::from_str(config_str)?;
        let labels = value
            .get("id2label")
            .and_then(|v| v.as_object())
            .ok_or_else(|| ResumeParserError::ModelLoading("config.json has no id2label".to_string()))?;

        labels
            .iter()
            .map(|(id, label)| {
                let id = id.parse::<usize>().map_err(|e| {
                    ResumeParserError::ModelLoading(format!("Invalid label id {}: {}", id, e))
                })?;
                Ok((id, label.as_str().unwrap_or("O").to_string()))
            })
            .collect()
    }

    fn predict(&self, text: &str) -> Result<Vec<TokenPrediction>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ResumeParserError::Ner(format!("Tokenization failed: {}", e)))?;

        let len = encoding.get_ids().len().min(MAX_TOKENS);
        if encoding.get_ids().len() > MAX_TOKENS {
            log::debug!("Truncating NER input from {} to {} tokens", encoding.get_ids().len(), MAX_TOKENS);
        }

        let ids = &encoding.get_ids()[..len];
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        let logits = self.classifier.forward(&hidden)?.squeeze(0)?;
        let label_ids = logits.argmax(1)?.to_vec1::<u32>()?;

        let special = encoding.get_special_tokens_mask();
        let offsets = encoding.get_offsets();

        Ok(label_ids
            .into_iter()
            .enumerate()
            .filter(|(i, _)| special.get(*i).copied().unwrap_or(0) == 0)
            .map(|(i, label_id)| TokenPrediction {
                label: self
                    .id2label
                    .get(&(label_id as usize))
                    .cloned()
                    .unwrap_or_else(|| "O".to_string()),
                start: offsets[i].0,
                end: offsets[i].1,
            })
            .collect())
    }
}

impl TokenClassifier for BertTokenClassifier {
    fn classify(&self, text: &str) -> Result<Vec<Entity>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let predictions = self.predict(text).map_err(|e| match e {
            ResumeParserError::ModelError(msg) => ResumeParserError::Ner(msg),
            other => other,
        })?;
        Ok(aggregate_entities(text, &predictions))
    }

    fn name(&self) -> &str {
        &self.name
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, start: usize, end: usize) -> TokenPrediction {
        TokenPrediction {
            label: label.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(EntityKind::from_label("PER"), EntityKind::Person);
        assert_eq!(EntityKind::from_label("person"), EntityKind::Person);
        assert_eq!(EntityKind::from_label("ORG"), EntityKind::Organization);
        assert_eq!(EntityKind::from_label("MISC"), EntityKind::Miscellaneous);
        assert_eq!(EntityKind::from_label("DATE"), EntityKind::Other("DATE".to_string()));
    }

    #[test]
    fn test_aggregate_joins_subwords_and_inside_tags() {
        let text = "Johnathan Smith uses Kubernetes";
        let predictions = vec![
            prediction("B-PER", 0, 4),
            prediction("B-PER", 4, 9),
            prediction("I-PER", 10, 15),
            prediction("O", 16, 20),
            prediction("B-MISC", 21, 31),
        ];

        let entities = aggregate_entities(text, &predictions);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "Johnathan Smith");
        assert_eq!(entities[0].kind, EntityKind::Person);
        assert_eq!(entities[1].text, "Kubernetes");
        assert_eq!(entities[1].kind, EntityKind::Miscellaneous);
    }

    #[test]
    fn test_aggregate_splits_on_new_begin_tag() {
        let text = "Google Microsoft";
        let predictions = vec![prediction("B-ORG", 0, 6), prediction("B-ORG", 7, 16)];

        let entities = aggregate_entities(text, &predictions);
        let names: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(names, vec!["Google", "Microsoft"]);
    }

    #[test]
    fn test_parse_labels_from_config() {
        let labels = BertTokenClassifier::parse_labels(
            r#"{"id2label": {"0": "O", "1": "B-PER", "2": "I-PER"}}"#,
        )
        .unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[&1], "B-PER");
        assert!(BertTokenClassifier::parse_labels("{}").is_err());
    }
}

//! Sentence embeddings using Model2Vec

use crate::error::{Result, ResumeParserError};
use model2vec_rs::model::StaticModel;
use std::path::Path;
use std::time::Instant;

/// Maps texts to fixed-size vectors
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ResumeParserError::Embedding("Embedder returned no vector".to_string()))
    }
}

pub struct Model2VecEmbedder {
    model: StaticModel,
}

impl Model2VecEmbedder {
    pub fn load(model_path: &Path) -> Result<Self> {
        let start_time = Instant::now();
        log::info!("Loading Model2Vec embedding model from: {}", model_path.display());

        let model = StaticModel::from_pretrained(
            model_path,
            None, // token
            None, // normalize
            None, // subfolder
        )
        .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to load embedding model: {}", e)))?;

        log::info!("Embedding model loaded in {:.2?}", start_time.elapsed());

        Ok(Self { model })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.model.encode(texts))
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.model.encode_single(text))
    }
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ResumeParserError::Embedding(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot_product / (norm_a * norm_b))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::LetterEmbedder;
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_embed_one_uses_batch_path() {
        let embedder = LetterEmbedder;
        let vector = embedder.embed_one("abba").unwrap();
        assert_eq!(vector[0], 2.0);
        assert_eq!(vector[1], 2.0);
    }
}

//! Embedding-ranked keyphrase extraction with Maximal Marginal Relevance

use crate::error::Result;
use crate::processing::embeddings::{cosine_similarity, Embedder};
use crate::processing::text_processor::TextProcessor;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Keyphrase {
    pub phrase: String,
    pub relevance: f32,
}

pub struct KeyphraseExtractor {
    processor: TextProcessor,
    max_ngram: usize,
    top_n: usize,
    diversity: f32,
}

impl Default for KeyphraseExtractor {
    fn default() -> Self {
        Self::new(3, 10, 0.7)
    }
}

impl KeyphraseExtractor {
    pub fn new(max_ngram: usize, top_n: usize, diversity: f32) -> Self {
        Self {
            processor: TextProcessor::new(),
            max_ngram: max_ngram.max(1),
            top_n,
            diversity: diversity.clamp(0.0, 1.0),
        }
    }

    /// Unique 1..=max_ngram word sequences over the stop-word-filtered tokens, in first-seen order
    pub fn candidates(&self, text: &str) -> Vec<String> {
        let tokens = self.processor.tokenize(text);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for n in 1..=self.max_ngram {
            for window in tokens.windows(n) {
                let phrase = window.join(" ");
                if seen.insert(phrase.clone()) {
                    candidates.push(phrase);
                }
            }
        }

        candidates
    }

    /// Pick up to `top_n` phrases relevant to the document but not redundant with each other
    pub fn extract(&self, text: &str, embedder: &dyn Embedder) -> Result<Vec<Keyphrase>> {
        let candidates = self.candidates(text);
        if candidates.is_empty() || self.top_n == 0 {
            return Ok(Vec::new());
        }

        let document_embedding = embedder.embed_one(text)?;
        let candidate_embeddings = embedder.embed(&candidates)?;

        let relevance = candidate_embeddings
            .iter()
            .map(|embedding| cosine_similarity(embedding, &document_embedding))
            .collect::<Result<Vec<f32>>>()?;

        let selected = self.maximal_marginal_relevance(&relevance, &candidate_embeddings)?;

        log::debug!(
            "Selected {} keyphrases out of {} candidates",
            selected.len(),
            candidates.len()
        );

        Ok(selected
            .into_iter()
            .map(|idx| Keyphrase {
                phrase: candidates[idx].clone(),
                relevance: relevance[idx],
            })
            .collect())
    }

    fn maximal_marginal_relevance(&self, relevance: &[f32], embeddings: &[Vec<f32>]) -> Result<Vec<usize>> {
        let Some(first) = argmax(relevance.iter().copied().enumerate()) else {
            return Ok(Vec::new());
        };

        let mut selected = vec![first];
        let mut remaining: Vec<usize> = (0..relevance.len()).filter(|&i| i != first).collect();

        while selected.len() < self.top_n && !remaining.is_empty() {
            let mut scores = Vec::with_capacity(remaining.len());
            for (position, &candidate) in remaining.iter().enumerate() {
                let mut redundancy = f32::MIN;
                for &chosen in &selected {
                    redundancy = redundancy.max(cosine_similarity(&embeddings[candidate], &embeddings[chosen])?);
                }
                let score = (1.0 - self.diversity) * relevance[candidate] - self.diversity * redundancy;
                scores.push((position, score));
            }

            let Some(best) = argmax(scores.into_iter()) else {
                break;
            };
            selected.push(remaining.remove(best));
        }

        Ok(selected)
    }
}

/// Index of the largest score; the first one wins ties
fn argmax(scores: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, score) in scores {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::testing::{FailingEmbedder, LetterEmbedder};

    #[test]
    fn test_candidates_cover_ngrams_without_stop_words() {
        let extractor = KeyphraseExtractor::new(3, 10, 0.7);
        let candidates = extractor.candidates("built data pipelines with apache spark");

        assert!(candidates.contains(&"spark".to_string()));
        assert!(candidates.contains(&"apache spark".to_string()));
        assert!(candidates.contains(&"pipelines apache spark".to_string()));
        assert!(!candidates.iter().any(|c| c.split(' ').any(|w| w == "with")));
    }

    #[test]
    fn test_candidates_are_unique() {
        let extractor = KeyphraseExtractor::new(1, 10, 0.7);
        let candidates = extractor.candidates("rust rust rust go");
        assert_eq!(candidates, vec!["rust", "go"]);
    }

    #[test]
    fn test_extract_respects_top_n() {
        let extractor = KeyphraseExtractor::new(2, 3, 0.7);
        let phrases = extractor
            .extract("kubernetes docker terraform ansible jenkins", &LetterEmbedder)
            .unwrap();
        assert_eq!(phrases.len(), 3);

        let unique: HashSet<&str> = phrases.iter().map(|p| p.phrase.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_first_pick_is_most_relevant() {
        let extractor = KeyphraseExtractor::new(1, 1, 0.7);
        let phrases = extractor.extract("aaaa aaab zzzz", &LetterEmbedder).unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].phrase, "aaaa");
    }

    #[test]
    fn test_extract_propagates_embedder_failure() {
        let extractor = KeyphraseExtractor::default();
        assert!(extractor.extract("rust developer", &FailingEmbedder).is_err());
        assert!(extractor.extract("", &FailingEmbedder).unwrap().is_empty());
    }
}

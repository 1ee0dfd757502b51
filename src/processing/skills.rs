//! Skill extraction combining keyphrases, NER, exact matching and semantic similarity

use crate::error::{Result, ResumeParserError};
use crate::processing::embeddings::{cosine_similarity, Embedder};
use crate::processing::keyphrase::KeyphraseExtractor;
use crate::processing::ner::{EntityKind, TokenClassifier};
use crate::processing::text_processor::clean_text;
use crate::processing::vocabulary::KeywordDictionary;
use crate::profile::{ExtractionWarning, SkillSet};
use aho_corasick::{AhoCorasick, MatchKind};
use std::sync::Arc;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

pub struct SkillEngine {
    vocabulary: Arc<KeywordDictionary>,
    terms: Vec<String>,
    matcher: AhoCorasick,
    keyphrases: KeyphraseExtractor,
    embedder: Option<Arc<dyn Embedder>>,
    term_embeddings: Option<Vec<Vec<f32>>>,
    classifier: Option<Arc<dyn TokenClassifier>>,
    similarity_threshold: f32,
}

impl SkillEngine {
    /// Engine with only the exact-match signal enabled
    pub fn new(vocabulary: Arc<KeywordDictionary>) -> Result<Self> {
        let terms: Vec<String> = vocabulary.terms().map(str::to_string).collect();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&terms)
            .map_err(|e| ResumeParserError::Vocabulary(format!("Failed to build skill matcher: {}", e)))?;

        Ok(Self {
            vocabulary,
            terms,
            matcher,
            keyphrases: KeyphraseExtractor::default(),
            embedder: None,
            term_embeddings: None,
            classifier: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        })
    }

    /// Enable keyphrase and semantic signals; vocabulary vectors are computed once here
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.term_embeddings = match embedder.embed(&self.terms) {
            Ok(embeddings) if embeddings.len() == self.terms.len() => Some(embeddings),
            Ok(embeddings) => {
                log::warn!(
                    "Embedder returned {} vectors for {} vocabulary terms, semantic matching disabled",
                    embeddings.len(),
                    self.terms.len()
                );
                None
            }
            Err(e) => {
                log::warn!("Failed to embed vocabulary, semantic matching disabled: {}", e);
                None
            }
        };
        self.embedder = Some(embedder);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TokenClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_keyphrases(mut self, keyphrases: KeyphraseExtractor) -> Self {
        self.keyphrases = keyphrases;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn vocabulary(&self) -> &KeywordDictionary {
        &self.vocabulary
    }

    pub fn extract(&self, text: &str) -> SkillSet {
        let mut warnings = Vec::new();
        self.extract_with_warnings(text, &mut warnings)
    }

    /// Union of all available signals; failing signals are logged and recorded in `warnings`
    pub fn extract_with_warnings(&self, text: &str, warnings: &mut Vec<ExtractionWarning>) -> SkillSet {
        let mut found = SkillSet::new();
        if text.trim().is_empty() {
            return found;
        }

        let cleaned = clean_text(text);

        if let Some(embedder) = &self.embedder {
            match self.keyphrase_signal(&cleaned, embedder.as_ref()) {
                Ok(terms) => found.extend(terms),
                Err(e) => record_failure(warnings, "keyphrase", &e),
            }
        }

        if let Some(classifier) = &self.classifier {
            match self.entity_signal(text, classifier.as_ref()) {
                Ok(terms) => found.extend(terms),
                Err(e) => record_failure(warnings, "ner", &e),
            }
        }

        found.extend(self.exact_signal(&cleaned));

        if let Some(embedder) = &self.embedder {
            match self.semantic_signal(&cleaned, embedder.as_ref()) {
                Ok(terms) => found.extend(terms),
                Err(e) => record_failure(warnings, "semantic", &e),
            }
        }

        log::debug!("Extracted {} skills from {} characters", found.len(), text.len());
        found
    }

    fn keyphrase_signal(&self, cleaned: &str, embedder: &dyn Embedder) -> Result<Vec<String>> {
        Ok(self
            .keyphrases
            .extract(cleaned, embedder)?
            .into_iter()
            .map(|k| k.phrase)
            .filter(|phrase| self.vocabulary.contains(phrase))
            .collect())
    }

    fn entity_signal(&self, text: &str, classifier: &dyn TokenClassifier) -> Result<Vec<String>> {
        Ok(classifier
            .classify(text)?
            .into_iter()
            .filter(|e| matches!(e.kind, EntityKind::Organization | EntityKind::Miscellaneous))
            .map(|e| e.text.to_lowercase())
            .filter(|t| self.vocabulary.contains(t))
            .collect())
    }

    /// Whole-word occurrences of vocabulary terms, overlapping matches included
    pub fn exact_signal(&self, cleaned: &str) -> Vec<String> {
        let mut found = Vec::new();
        for mat in self.matcher.find_overlapping_iter(cleaned) {
            if is_word_bounded(cleaned, mat.start(), mat.end()) {
                found.push(self.terms[mat.pattern().as_usize()].clone());
            }
        }
        found
    }

    fn semantic_signal(&self, cleaned: &str, embedder: &dyn Embedder) -> Result<Vec<String>> {
        let term_embeddings = self.term_embeddings.as_ref().ok_or_else(|| {
            ResumeParserError::Embedding("vocabulary embeddings unavailable".to_string())
        })?;

        let text_embedding = embedder.embed_one(cleaned)?;
        let mut found = Vec::new();
        for (term, embedding) in self.terms.iter().zip(term_embeddings) {
            if cosine_similarity(&text_embedding, embedding)? > self.similarity_threshold {
                found.push(term.clone());
            }
        }
        Ok(found)
    }
}

fn record_failure(warnings: &mut Vec<ExtractionWarning>, signal: &str, error: &ResumeParserError) {
    log::warn!("Skipping {} skill signal: {}", signal, error);
    let warning = ExtractionWarning::SignalFailed {
        signal: signal.to_string(),
        reason: error.to_string(),
    };
    if !warnings.contains(&warning) {
        warnings.push(warning);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let first = text[start..end].chars().next();
    let last = text[start..end].chars().next_back();

    let left_ok = match (before, first) {
        (Some(b), Some(f)) => !(is_word_char(b) && is_word_char(f)),
        _ => true,
    };
    let right_ok = match (last, after) {
        (Some(l), Some(a)) => !(is_word_char(l) && is_word_char(a)),
        _ => true,
    };
    left_ok && right_ok
}

/// Combine the explicit skills section with detected skills.
///
/// An empty section yields the detected set; otherwise the union of both.
pub fn merge_skill_text(explicit: &str, detected: &SkillSet) -> SkillSet {
    if explicit.trim().is_empty() {
        detected.clone()
    } else {
        SkillSet::from_delimited(explicit).union(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::embeddings::testing::{FailingEmbedder, LetterEmbedder};
    use crate::processing::ner::testing::{entity, FailingClassifier, FixedClassifier};

    fn vocabulary(terms: &[&str]) -> Arc<KeywordDictionary> {
        Arc::new(KeywordDictionary::from_terms(terms))
    }

    #[test]
    fn test_exact_match_respects_word_boundaries() {
        let engine = SkillEngine::new(vocabulary(&["go", "rust", "machine learning", "learning"])).unwrap();
        let skills = engine.extract("Worked at Google using Rust and machine learning");

        assert!(skills.contains("rust"));
        assert!(skills.contains("machine learning"));
        assert!(skills.contains("learning"));
        assert!(!skills.contains("go"));
    }

    #[test]
    fn test_filler_phrases_do_not_block_matches() {
        let engine = SkillEngine::new(vocabulary(&["docker", "kubernetes"])).unwrap();
        let skills = engine.extract("Gained hands-on experience with Docker; familiar with Kubernetes.");
        assert_eq!(skills.render(), "Docker, Kubernetes");
    }

    #[test]
    fn test_empty_text_yields_empty_set() {
        let engine = SkillEngine::new(vocabulary(&["rust"])).unwrap();
        assert!(engine.extract("   ").is_empty());
    }

    #[test]
    fn test_entity_signal_filters_by_kind_and_vocabulary() {
        let classifier = FixedClassifier(vec![
            entity("Salesforce", EntityKind::Organization),
            entity("Kafka", EntityKind::Person),
            entity("Acme Corp", EntityKind::Organization),
        ]);
        let engine = SkillEngine::new(vocabulary(&["salesforce", "kafka"]))
            .unwrap()
            .with_classifier(Arc::new(classifier));

        let skills = engine.extract("Integrated CRM systems");
        assert!(skills.contains("salesforce"));
        assert!(!skills.contains("kafka"));
        assert_eq!(skills.len(), 1);
    }

    #[test]
    fn test_failing_signals_are_skipped_and_recorded() {
        let engine = SkillEngine::new(vocabulary(&["python"]))
            .unwrap()
            .with_classifier(Arc::new(FailingClassifier))
            .with_embedder(Arc::new(FailingEmbedder));

        let mut warnings = Vec::new();
        let skills = engine.extract_with_warnings("Python scripting", &mut warnings);

        assert!(skills.contains("python"));
        let signals: Vec<&str> = warnings
            .iter()
            .filter_map(|w| match w {
                ExtractionWarning::SignalFailed { signal, .. } => Some(signal.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(signals, vec!["keyphrase", "ner", "semantic"]);
    }

    #[test]
    fn test_semantic_signal_uses_threshold() {
        let engine = SkillEngine::new(vocabulary(&["docker", "zzz"]))
            .unwrap()
            .with_embedder(Arc::new(LetterEmbedder));

        let skills = engine.extract("rekcod");
        assert!(skills.contains("docker"));
        assert!(!skills.contains("zzz"));

        let strict = SkillEngine::new(vocabulary(&["docker"]))
            .unwrap()
            .with_embedder(Arc::new(LetterEmbedder))
            .with_similarity_threshold(0.95);
        assert!(strict.extract("rekcodx").is_empty());
        assert!(engine.extract("rekcodx").contains("docker"));
    }

    #[test]
    fn test_merge_skill_text() {
        let detected = SkillSet::from_delimited("docker, python");

        assert_eq!(merge_skill_text("", &detected), detected);
        let merged = merge_skill_text("Python, SQL\nGit", &detected);
        assert_eq!(merged.render(), "Docker, Git, Python, Sql");
    }
}

//! Extraction strategies and the process-wide extraction context

use crate::config::{Config, Strategy};
use crate::error::{Result, ResumeParserError};
use crate::input::extract_lines;
use crate::llm::{CandleGenerator, GenerativeExtractor, TextGenerator};
use crate::models::{get_device_with_override, ModelManager};
use crate::processing::blocks::{BlockParsers, ParseContext};
use crate::processing::embeddings::{Embedder, Model2VecEmbedder};
use crate::processing::identity::IdentityExtractor;
use crate::processing::keyphrase::KeyphraseExtractor;
use crate::processing::ner::{BertTokenClassifier, TokenClassifier};
use crate::processing::sections::{segment, SectionKind};
use crate::processing::skills::{merge_skill_text, SkillEngine};
use crate::processing::vocabulary::KeywordDictionary;
use crate::profile::{ExtractionSource, ExtractionWarning, ResumeProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Bytes of one document in, profile out
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ResumeProfile>;
}

/// Section segmentation, block parsers and the skill engine
pub struct RuleBasedExtractor {
    identity: IdentityExtractor,
    parsers: BlockParsers,
    skills: Arc<SkillEngine>,
}

impl RuleBasedExtractor {
    pub fn new(skills: Arc<SkillEngine>) -> Self {
        Self {
            identity: IdentityExtractor::new(),
            parsers: BlockParsers::default(),
            skills,
        }
    }

    pub fn with_identity(mut self, identity: IdentityExtractor) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_parsers(mut self, parsers: BlockParsers) -> Self {
        self.parsers = parsers;
        self
    }

    /// Never fails: malformed text degrades to empty fields and warnings
    pub fn extract_from_lines(&self, lines: &[String], filename: &str) -> ResumeProfile {
        if lines.is_empty() {
            log::warn!("{}: no text extracted", filename);
            return ResumeProfile::builder(ExtractionSource::RuleBased, filename)
                .warning(ExtractionWarning::ExtractionEmpty)
                .build();
        }

        let mut warnings = Vec::new();
        let identity = self.identity.extract(lines, &mut warnings);
        let sections = segment(lines);
        log::debug!(
            "{}: sections found {:?}",
            filename,
            sections.kinds().collect::<Vec<_>>()
        );

        let mut ctx = ParseContext::new(&self.skills, &mut warnings);
        let education = self.parsers.education.parse(sections.get(SectionKind::Education), &mut ctx);
        let experience = self.parsers.experience.parse(sections.get(SectionKind::Experience), &mut ctx);
        let projects = self.parsers.projects.parse(sections.get(SectionKind::Projects), &mut ctx);
        let certifications = self
            .parsers
            .certifications
            .parse(sections.get(SectionKind::Certifications), &mut ctx);
        let achievements = self
            .parsers
            .achievements
            .parse(sections.get(SectionKind::Achievements), &mut ctx);
        let summary = self
            .parsers
            .summary
            .parse(sections.get(SectionKind::Objective), &mut ctx)
            .into_iter()
            .next();

        let detected = self.skills.extract_with_warnings(&lines.join("\n"), &mut warnings);
        let skills = merge_skill_text(&sections.get(SectionKind::Skills).join("\n"), &detected);

        ResumeProfile::builder(ExtractionSource::RuleBased, filename)
            .name(identity.name)
            .title(identity.title)
            .contact(identity.contact)
            .all_links(identity.all_links)
            .education(education)
            .experience(experience)
            .projects(projects)
            .certifications(certifications)
            .achievements(achievements)
            .summary(summary)
            .skills(skills)
            .line_count(lines.len())
            .warnings(warnings)
            .build()
    }
}

#[async_trait]
impl ResumeExtractor for RuleBasedExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ResumeProfile> {
        let lines = extract_lines(bytes, filename)?;
        Ok(self.extract_from_lines(&lines, filename))
    }
}

/// Rule-based first; the generative path runs only when identity is incomplete
pub struct FallbackExtractor {
    rule_based: Arc<RuleBasedExtractor>,
    generative: Option<Arc<GenerativeExtractor>>,
}

impl FallbackExtractor {
    pub fn new(rule_based: Arc<RuleBasedExtractor>, generative: Option<Arc<GenerativeExtractor>>) -> Self {
        Self { rule_based, generative }
    }
}

#[async_trait]
impl ResumeExtractor for FallbackExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ResumeProfile> {
        let lines = extract_lines(bytes, filename)?;
        let profile = self.rule_based.extract_from_lines(&lines, filename);

        if lines.is_empty() || !profile.identity_incomplete() {
            return Ok(profile);
        }
        let Some(generative) = &self.generative else {
            return Ok(profile);
        };

        log::info!("{}: identity incomplete, retrying with the generative path", filename);
        match generative.extract_from_lines(&lines, filename).await {
            Ok(generated) => Ok(generated),
            Err(e) => {
                log::warn!("{}: generative retry failed, keeping rule-based result: {}", filename, e);
                Ok(profile)
            }
        }
    }
}

/// Vocabulary, models and extractors, built once and shared read-only
pub struct ExtractionContext {
    strategy: Strategy,
    skills: Arc<SkillEngine>,
    rule_based: Arc<RuleBasedExtractor>,
    generative: Option<Arc<GenerativeExtractor>>,
}

impl ExtractionContext {
    /// Load the vocabulary and every configured model.
    ///
    /// Embedding and NER models are optional signals: a model that cannot be loaded is
    /// logged and left out. The generator is only loaded for the generative and auto
    /// strategies, and is required for the generative one.
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.validate()?;

        let vocabulary = match &config.skills.vocabulary_path {
            Some(path) => KeywordDictionary::load(path)?,
            None => KeywordDictionary::builtin(),
        };
        log::info!("Skill vocabulary holds {} terms", vocabulary.len());

        let manager = ModelManager::new(config.models_dir().clone()).await?;
        let device = get_device_with_override()?;

        let embedder: Option<Arc<dyn Embedder>> = match &config.models.embedding_model {
            Some(reference) => optional_model("embedding", async {
                let path = manager.ensure(reference).await?;
                Ok::<_, ResumeParserError>(Arc::new(Model2VecEmbedder::load(&path)?) as Arc<dyn Embedder>)
            })
            .await,
            None => None,
        };

        let mut classifiers: Vec<Arc<dyn TokenClassifier>> = Vec::new();
        for reference in [&config.models.ner_model, &config.models.secondary_ner_model]
            .into_iter()
            .flatten()
        {
            let loaded = optional_model("ner", async {
                let path = manager.ensure(reference).await?;
                Ok::<_, ResumeParserError>(
                    Arc::new(BertTokenClassifier::load(&path, device.clone())?) as Arc<dyn TokenClassifier>
                )
            })
            .await;
            classifiers.extend(loaded);
        }

        let generator: Option<Arc<dyn TextGenerator>> = match (&config.models.generator_model, config.extraction.strategy) {
            (_, Strategy::RuleBased) => None,
            (Some(reference), strategy) => {
                let loading = async {
                    let path = manager.ensure(reference).await?;
                    Ok::<_, ResumeParserError>(
                        Arc::new(CandleGenerator::load(&path, device.clone(), &config.generative)?)
                            as Arc<dyn TextGenerator>,
                    )
                };
                if strategy == Strategy::Generative {
                    Some(loading.await?)
                } else {
                    optional_model("generator", loading).await
                }
            }
            (None, Strategy::Generative) => {
                return Err(ResumeParserError::Configuration(
                    "the generative strategy needs models.generator_model".to_string(),
                ))
            }
            (None, Strategy::Auto) => None,
        };

        let mut skills = SkillEngine::new(Arc::new(vocabulary))?
            .with_keyphrases(KeyphraseExtractor::new(
                config.skills.max_ngram,
                config.skills.keyphrase_top_n,
                config.skills.keyphrase_diversity,
            ))
            .with_similarity_threshold(config.skills.similarity_threshold);
        if let Some(embedder) = embedder {
            skills = skills.with_embedder(embedder);
        }
        if let Some(primary) = classifiers.first() {
            skills = skills.with_classifier(primary.clone());
        }

        Ok(Self::from_parts(config, Arc::new(skills), classifiers, generator))
    }

    /// Assemble a context from already-loaded collaborators
    pub fn from_parts(
        config: &Config,
        skills: Arc<SkillEngine>,
        classifiers: Vec<Arc<dyn TokenClassifier>>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let mut identity = IdentityExtractor::new()
            .with_scan_limits(config.extraction.header_lines, config.extraction.name_scan_lines);
        let mut classifiers = classifiers.into_iter();
        if let Some(primary) = classifiers.next() {
            identity = identity.with_primary_ner(primary);
        }
        if let Some(secondary) = classifiers.next() {
            identity = identity.with_secondary_ner(secondary);
        }

        let backfill = IdentityExtractor::new()
            .with_scan_limits(config.extraction.header_lines, config.extraction.name_scan_lines);
        let generative = generator.map(|generator| {
            Arc::new(GenerativeExtractor::new(generator, &config.generative).with_identity(backfill))
        });

        Self {
            strategy: config.extraction.strategy,
            rule_based: Arc::new(RuleBasedExtractor::new(skills.clone()).with_identity(identity)),
            skills,
            generative,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn skills(&self) -> &SkillEngine {
        &self.skills
    }

    /// Extractor for the configured strategy
    pub fn extractor(&self) -> Result<Arc<dyn ResumeExtractor>> {
        self.extractor_for(self.strategy)
    }

    pub fn extractor_for(&self, strategy: Strategy) -> Result<Arc<dyn ResumeExtractor>> {
        match strategy {
            Strategy::RuleBased => Ok(self.rule_based.clone()),
            Strategy::Generative => self
                .generative
                .clone()
                .map(|g| g as Arc<dyn ResumeExtractor>)
                .ok_or_else(|| {
                    ResumeParserError::Configuration("no generator model is loaded".to_string())
                }),
            Strategy::Auto => Ok(Arc::new(FallbackExtractor::new(
                self.rule_based.clone(),
                self.generative.clone(),
            ))),
        }
    }
}

async fn optional_model<T>(kind: &str, loading: impl std::future::Future<Output = Result<T>>) -> Option<T> {
    match loading.await {
        Ok(model) => Some(model),
        Err(e) => {
            log::warn!("Continuing without {} model: {}", kind, e);
            None
        }
    }
}

static GLOBAL: OnceCell<Arc<ExtractionContext>> = OnceCell::const_new();

/// Initialise the process-wide context once; concurrent callers share the first result
pub async fn init_global(config: &Config) -> Result<Arc<ExtractionContext>> {
    GLOBAL
        .get_or_try_init(|| async { ExtractionContext::initialize(config).await.map(Arc::new) })
        .await
        .cloned()
}

pub fn global() -> Result<Arc<ExtractionContext>> {
    GLOBAL.get().cloned().ok_or(ResumeParserError::NotInitialized)
}

pub fn is_ready() -> bool {
    GLOBAL.initialized()
}

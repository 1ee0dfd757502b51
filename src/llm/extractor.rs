//! Generative extraction: single-pass prompt with a chunked fallback

use crate::config::GenerativeConfig;
use crate::error::{Result, ResumeParserError};
use crate::input::extract_lines;
use crate::llm::chunking::plan_chunks;
use crate::llm::inference::TextGenerator;
use crate::llm::json_repair::parse_json;
use crate::llm::prompts::PromptTemplates;
use crate::pipeline::ResumeExtractor;
use crate::processing::identity::{normalize_phone, IdentityExtractor};
use crate::profile::{
    ContactInfo, ExperienceEntry, ExtractionSource, ExtractionWarning, ResumeProfile, SkillSet,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

type JsonObject = Map<String, Value>;

/// Identity and work history as returned by the model, already normalised
#[derive(Debug, Default)]
struct ModelOutput {
    full_name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    work_experience: Vec<ExperienceEntry>,
}

impl ModelOutput {
    fn identity_from(object: &JsonObject) -> Self {
        Self {
            full_name: string_field(object, "full_name"),
            email: string_field(object, "email"),
            phone_number: string_field(object, "phone_number"),
            work_experience: Vec::new(),
        }
    }

    fn from_object(object: &JsonObject) -> Self {
        Self {
            work_experience: experience_entries(object),
            ..Self::identity_from(object)
        }
    }
}

pub struct GenerativeExtractor {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
    identity: IdentityExtractor,
    chunk_size: usize,
    rate_limit: Duration,
    head_line_limit: usize,
}

impl GenerativeExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &GenerativeConfig) -> Self {
        Self {
            generator,
            templates: PromptTemplates::default(),
            identity: IdentityExtractor::new(),
            chunk_size: config.chunk_size.max(1),
            rate_limit: config.rate_limit(),
            head_line_limit: config.head_line_limit,
        }
    }

    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Heuristics used to backfill identity fields the model left out
    pub fn with_identity(mut self, identity: IdentityExtractor) -> Self {
        self.identity = identity;
        self
    }

    pub async fn extract_from_lines(&self, lines: &[String], filename: &str) -> Result<ResumeProfile> {
        if lines.is_empty() {
            return Ok(ResumeProfile::builder(ExtractionSource::Generative, filename)
                .warning(ExtractionWarning::ExtractionEmpty)
                .build());
        }

        let prompt = self.templates.render_full(&lines.join("\n"));
        let raw = self.generator.generate(&prompt).await?;

        let (output, source, warnings) = match parse_json::<JsonObject>(&raw) {
            Ok(object) => (ModelOutput::from_object(&object), ExtractionSource::Generative, Vec::new()),
            Err(e) => {
                log::warn!("Single-pass output unusable ({}), falling back to chunked extraction", e);
                let (output, warnings) = self.extract_chunked(lines).await?;
                (output, ExtractionSource::GenerativeChunked, warnings)
            }
        };

        Ok(self.assemble(output, source, warnings, lines, filename))
    }

    /// One head call for identity, then one call per experience batch
    async fn extract_chunked(&self, lines: &[String]) -> Result<(ModelOutput, Vec<ExtractionWarning>)> {
        let plan = plan_chunks(lines, self.head_line_limit, self.chunk_size);
        log::info!("Chunked fallback: head plus {} experience chunks", plan.chunks.len());

        tokio::time::sleep(self.rate_limit).await;
        let raw = self.generator.generate(&self.templates.render_head(&plan.head)).await?;
        let head: JsonObject = parse_json(&raw).map_err(|e| {
            ResumeParserError::JsonRepair(format!("head section could not be parsed: {}", e))
        })?;
        let mut output = ModelOutput::identity_from(&head);

        let mut warnings = Vec::new();
        for (index, chunk) in plan.chunks.iter().enumerate() {
            tokio::time::sleep(self.rate_limit).await;
            let raw = self.generator.generate(&self.templates.render_chunk(chunk)).await?;

            match parse_json::<JsonObject>(&raw) {
                Ok(object) => output.work_experience.extend(experience_entries(&object)),
                Err(e) => {
                    log::warn!("Skipping experience chunk {}: {}", index, e);
                    warnings.push(ExtractionWarning::ChunkSkipped {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok((output, warnings))
    }

    fn assemble(
        &self,
        output: ModelOutput,
        source: ExtractionSource,
        warnings: Vec<ExtractionWarning>,
        lines: &[String],
        filename: &str,
    ) -> ResumeProfile {
        let ModelOutput {
            full_name,
            email,
            phone_number,
            work_experience,
        } = output;

        let name = full_name.or_else(|| self.identity.heuristic_name(lines));
        let heuristic = self.identity.extract_contact(lines, name.as_deref());
        let contact = ContactInfo {
            email: email.or(heuristic.email),
            phone: phone_number.map(|p| normalize_phone(&p)).filter(|p| !p.is_empty()).or(heuristic.phone),
            ..ContactInfo::default()
        };

        let skills: SkillSet = work_experience.iter().flat_map(|e| e.technology.iter()).collect();

        ResumeProfile::builder(source, filename)
            .name(name)
            .contact(contact)
            .experience(work_experience)
            .skills(skills)
            .line_count(lines.len())
            .warnings(warnings)
            .build()
    }
}

#[async_trait]
impl ResumeExtractor for GenerativeExtractor {
    async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ResumeProfile> {
        let lines = extract_lines(bytes, filename)?;
        self.extract_from_lines(&lines, filename).await
    }
}

/// Trimmed non-empty string; numbers are accepted and rendered
fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text)
    }
}

fn string_field(object: &JsonObject, key: &str) -> Option<String> {
    object.get(key).and_then(scalar)
}

fn experience_entries(object: &JsonObject) -> Vec<ExperienceEntry> {
    let Some(Value::Array(items)) = object.get("work_experience") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|record| ExperienceEntry {
            company: string_field(record, "company_name"),
            customer: string_field(record, "customer_name"),
            role: string_field(record, "role"),
            dates: string_field(record, "duration"),
            technology: record
                .get("skills_technologies")
                .and_then(Value::as_array)
                .map(|skills| {
                    skills
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            industry: string_field(record, "industry"),
            location: string_field(record, "location"),
        })
        .filter(|entry| *entry != ExperienceEntry::default())
        .collect()
}

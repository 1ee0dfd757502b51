//! Candidate profile data model and the two wire schemas it serialises to

use crate::processing::text_processor::title_case;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub links: Vec<String>,
}

impl ContactInfo {
    pub fn has_reachability(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub customer: Option<String>,
    pub role: Option<String>,
    pub dates: Option<String>,
    pub technology: Vec<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub title: String,
    pub date: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub title: String,
    pub details: String,
}

/// Case-insensitive set of skill terms, stored lower-cased
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a rendered or free-form comma separated skill list
    pub fn from_delimited(text: &str) -> Self {
        text.split(|c| c == ',' || c == '\n').collect()
    }

    pub fn insert(&mut self, term: &str) -> bool {
        let normalized = term.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        self.0.insert(normalized)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(&term.trim().to_lowercase())
    }

    pub fn merge(&mut self, other: &SkillSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn union(&self, other: &SkillSet) -> SkillSet {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Title-cased terms in lexical order
    pub fn titled(&self) -> Vec<String> {
        let titled: BTreeSet<String> = self.0.iter().map(|s| title_case(s)).collect();
        titled.into_iter().collect()
    }

    pub fn render(&self) -> String {
        self.titled().join(", ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        set.extend(iter);
        set
    }
}

impl<S: AsRef<str>> Extend<S> for SkillSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for term in iter {
            self.insert(term.as_ref());
        }
    }
}

impl fmt::Display for SkillSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    RuleBased,
    Generative,
    GenerativeChunked,
}

impl ExtractionSource {
    pub fn is_generative(&self) -> bool {
        !matches!(self, ExtractionSource::RuleBased)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// The document produced no text lines
    ExtractionEmpty,
    /// No name, or neither email nor phone, could be recovered
    MissingIdentity,
    ChunkSkipped { index: usize, reason: String },
    SignalFailed { signal: String, reason: String },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionWarning::ExtractionEmpty => write!(f, "document contained no extractable text"),
            ExtractionWarning::MissingIdentity => write!(f, "candidate identity could not be recovered"),
            ExtractionWarning::ChunkSkipped { index, reason } => {
                write!(f, "experience chunk {} skipped: {}", index, reason)
            }
            ExtractionWarning::SignalFailed { signal, reason } => {
                write!(f, "{} signal unavailable: {}", signal, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub source: ExtractionSource,
    pub filename: String,
    pub parsed_at: DateTime<Utc>,
    pub line_count: usize,
    pub warnings: Vec<ExtractionWarning>,
}

/// Structured result of one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    name: Option<String>,
    title: Option<String>,
    contact: ContactInfo,
    experience: Vec<ExperienceEntry>,
    education: Vec<EducationEntry>,
    projects: Vec<ProjectEntry>,
    certifications: Vec<CertificationEntry>,
    achievements: Vec<String>,
    summary: Option<String>,
    skills: SkillSet,
    all_links: Vec<String>,
    metadata: ProfileMetadata,
}

impl ResumeProfile {
    pub fn builder(source: ExtractionSource, filename: impl Into<String>) -> ProfileBuilder {
        ProfileBuilder::new(source, filename)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn experience(&self) -> &[ExperienceEntry] {
        &self.experience
    }

    pub fn education(&self) -> &[EducationEntry] {
        &self.education
    }

    pub fn projects(&self) -> &[ProjectEntry] {
        &self.projects
    }

    pub fn certifications(&self) -> &[CertificationEntry] {
        &self.certifications
    }

    pub fn achievements(&self) -> &[String] {
        &self.achievements
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    pub fn all_links(&self) -> &[String] {
        &self.all_links
    }

    pub fn metadata(&self) -> &ProfileMetadata {
        &self.metadata
    }

    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.metadata.warnings
    }

    /// Missing name, or missing both email and phone
    pub fn identity_incomplete(&self) -> bool {
        self.name.is_none() || !self.contact.has_reachability()
    }

    pub fn to_wire(&self) -> WireProfile {
        if self.metadata.source.is_generative() {
            WireProfile::Generative(self.to_generative_wire())
        } else {
            WireProfile::RuleBased(self.to_rule_based_wire())
        }
    }

    fn to_rule_based_wire(&self) -> RuleBasedWire {
        RuleBasedWire {
            name: self.name.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            contact: WireContact {
                email: self.contact.email.clone().unwrap_or_default(),
                phone: self.contact.phone.clone().unwrap_or_default(),
                location: self.contact.location.clone().unwrap_or_default(),
                links: self.contact.links.clone(),
            },
            experience: self
                .experience
                .iter()
                .map(|e| WireExperience {
                    customer: e.customer.clone().unwrap_or_default(),
                    role: e.role.clone().unwrap_or_default(),
                    project_dates: e.dates.clone().unwrap_or_default(),
                    technology: e.technology.clone(),
                })
                .collect(),
            education: self
                .education
                .iter()
                .map(|e| WireEducation {
                    institution: e.institution.clone().unwrap_or_default(),
                    degree: e.degree.clone().unwrap_or_default(),
                    date: e.date.clone().unwrap_or_default(),
                })
                .collect(),
            skills: self.skills.render(),
            all_links: self.all_links.clone(),
            projects: self.projects.clone(),
            certifications: self.certifications.clone(),
            achievements: self.achievements.clone(),
            summary: self.summary.clone().unwrap_or_default(),
        }
    }

    fn to_generative_wire(&self) -> GenerativeWire {
        GenerativeWire {
            full_name: self.name.clone(),
            email: self.contact.email.clone(),
            phone_number: self.contact.phone.clone(),
            work_experience: self
                .experience
                .iter()
                .map(|e| WireWorkExperience {
                    company_name: e.company.clone(),
                    customer_name: e.customer.clone(),
                    role: e.role.clone(),
                    duration: e.dates.clone(),
                    skills_technologies: e.technology.clone(),
                    industry: e.industry.clone(),
                    location: e.location.clone(),
                })
                .collect(),
        }
    }
}

/// Assembles a [`ResumeProfile`]; the profile is immutable once built
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    profile: ResumeProfile,
}

impl ProfileBuilder {
    pub fn new(source: ExtractionSource, filename: impl Into<String>) -> Self {
        Self {
            profile: ResumeProfile {
                name: None,
                title: None,
                contact: ContactInfo::default(),
                experience: Vec::new(),
                education: Vec::new(),
                projects: Vec::new(),
                certifications: Vec::new(),
                achievements: Vec::new(),
                summary: None,
                skills: SkillSet::new(),
                all_links: Vec::new(),
                metadata: ProfileMetadata {
                    source,
                    filename: filename.into(),
                    parsed_at: Utc::now(),
                    line_count: 0,
                    warnings: Vec::new(),
                },
            },
        }
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.profile.name = non_empty(name);
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.profile.title = non_empty(title);
        self
    }

    pub fn contact(mut self, contact: ContactInfo) -> Self {
        self.profile.contact = contact;
        self
    }

    pub fn experience(mut self, experience: Vec<ExperienceEntry>) -> Self {
        self.profile.experience = experience;
        self
    }

    pub fn education(mut self, education: Vec<EducationEntry>) -> Self {
        self.profile.education = education;
        self
    }

    pub fn projects(mut self, projects: Vec<ProjectEntry>) -> Self {
        self.profile.projects = projects;
        self
    }

    pub fn certifications(mut self, certifications: Vec<CertificationEntry>) -> Self {
        self.profile.certifications = certifications;
        self
    }

    pub fn achievements(mut self, achievements: Vec<String>) -> Self {
        self.profile.achievements = achievements;
        self
    }

    pub fn summary(mut self, summary: Option<String>) -> Self {
        self.profile.summary = non_empty(summary);
        self
    }

    pub fn skills(mut self, skills: SkillSet) -> Self {
        self.profile.skills = skills;
        self
    }

    pub fn all_links(mut self, links: Vec<String>) -> Self {
        self.profile.all_links = links;
        self
    }

    pub fn line_count(mut self, line_count: usize) -> Self {
        self.profile.metadata.line_count = line_count;
        self
    }

    pub fn warning(mut self, warning: ExtractionWarning) -> Self {
        self.push_warning(warning);
        self
    }

    pub fn warnings(mut self, warnings: impl IntoIterator<Item = ExtractionWarning>) -> Self {
        for warning in warnings {
            self.push_warning(warning);
        }
        self
    }

    fn push_warning(&mut self, warning: ExtractionWarning) {
        if !self.profile.metadata.warnings.contains(&warning) {
            self.profile.metadata.warnings.push(warning);
        }
    }

    /// Finish the profile, adding `MissingIdentity` when identity is incomplete
    pub fn build(mut self) -> ResumeProfile {
        if self.profile.identity_incomplete() {
            self.push_warning(ExtractionWarning::MissingIdentity);
        }
        self.profile
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WireProfile {
    RuleBased(RuleBasedWire),
    Generative(GenerativeWire),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBasedWire {
    pub name: String,
    pub title: String,
    pub contact: WireContact,
    pub experience: Vec<WireExperience>,
    pub education: Vec<WireEducation>,
    pub skills: String,
    pub all_links: Vec<String>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub achievements: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContact {
    pub email: String,
    pub phone: String,
    pub location: String,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireExperience {
    pub customer: String,
    pub role: String,
    pub project_dates: String,
    pub technology: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEducation {
    pub institution: String,
    pub degree: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeWire {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub work_experience: Vec<WireWorkExperience>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireWorkExperience {
    pub company_name: Option<String>,
    pub customer_name: Option<String>,
    pub role: Option<String>,
    pub duration: Option<String>,
    pub skills_technologies: Vec<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

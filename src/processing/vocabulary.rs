//! Keyword dictionary of known skill and technology terms

use crate::error::{Result, ResumeParserError};
use std::collections::BTreeSet;
use std::path::Path;

/// Normalised, read-only set of vocabulary terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordDictionary {
    terms: BTreeSet<String>,
}

impl KeywordDictionary {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Load a vocabulary file.
    ///
    /// `.csv` files skip their header row and use the first column; any other
    /// file holds one term per line. Blank lines and `#` comments are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResumeParserError::Vocabulary(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let dictionary = if is_csv {
            Self::parse_csv(&content).map_err(|e| {
                ResumeParserError::Vocabulary(format!("Malformed CSV in {}: {}", path.display(), e))
            })?
        } else {
            Self::parse_lines(&content)
        };

        if dictionary.is_empty() {
            return Err(ResumeParserError::Vocabulary(format!(
                "{} contains no terms",
                path.display()
            )));
        }

        log::info!("Loaded {} vocabulary terms from {}", dictionary.len(), path.display());
        Ok(dictionary)
    }

    fn parse_csv(content: &str) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut terms = Vec::new();
        for record in reader.records() {
            if let Some(term) = record?.get(0) {
                terms.push(term.to_string());
            }
        }
        Ok(Self::from_terms(terms))
    }

    fn parse_lines(content: &str) -> Self {
        Self::from_terms(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Built-in technology vocabulary used when no file is configured
    pub fn builtin() -> Self {
        Self::from_terms(BUILTIN_TERMS)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(&term.trim().to_lowercase())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

const BUILTIN_TERMS: &[&str] = &[
    // Languages
    "rust", "python", "java", "javascript", "typescript", "c", "c++", "c#", "go", "golang",
    "ruby", "php", "swift", "kotlin", "scala", "r", "matlab", "perl", "bash", "powershell",
    "sql", "pl/sql", "t-sql", "cobol", "abap",
    // Web
    "react", "angular", "vue", "svelte", "html", "css", "sass", "tailwind", "bootstrap",
    "jquery", "node.js", "express", "next.js", "django", "flask", "fastapi", "spring",
    "spring boot", "asp.net", ".net", "laravel", "rails",
    // Infrastructure
    "docker", "kubernetes", "aws", "azure", "gcp", "terraform", "ansible", "jenkins",
    "gitlab", "github", "git", "ci/cd", "devops", "microservices", "rest", "graphql",
    "grpc", "nginx", "linux", "unix", "openshift", "helm", "prometheus", "grafana",
    // Data
    "postgresql", "mysql", "mongodb", "cassandra", "dynamodb", "sqlite", "oracle",
    "sql server", "redis", "elasticsearch", "kafka", "rabbitmq", "snowflake", "databricks",
    "spark", "hadoop", "airflow", "tableau", "power bi", "etl",
    // Machine learning
    "machine learning", "deep learning", "nlp", "computer vision", "tensorflow",
    "pytorch", "keras", "scikit-learn", "pandas", "numpy", "jupyter",
    // Enterprise
    "sap", "salesforce", "servicenow", "sharepoint", "jira", "confluence",
    // Practices and testing
    "agile", "scrum", "kanban", "tdd", "junit", "pytest", "selenium", "cypress",
];

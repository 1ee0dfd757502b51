//! Candidate identity and contact details from the top of the document

use crate::processing::ner::{EntityKind, TokenClassifier};
use crate::processing::sections::is_heading;
use crate::profile::{ContactInfo, ExtractionWarning};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

pub const DEFAULT_HEADER_LINES: usize = 10;
pub const DEFAULT_NAME_SCAN_LINES: usize = 5;

static CONTACT_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@|\d{3}|\d{10}|https?://|\.com/|linkedin|github|leetcode").expect("Invalid contact regex")
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("Invalid email regex")
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").expect("Invalid phone regex")
});

static ROLE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(engineer|developer|manager|analyst|consultant|architect|designer|lead|intern|director|specialist|scientist|administrator|officer|programmer)s?\b",
    )
    .expect("Invalid role regex")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://\S+|www\.\S+|\S+\.com/\S*").expect("Invalid link regex")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Za-z .'-]+,\s*(?:[A-Z]{2}|[A-Z][a-z]+(?: [A-Z][a-z]+)*)(?:\s+\d{5})?$")
        .expect("Invalid location regex")
});

/// Identity fields recovered from a line sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub title: Option<String>,
    pub contact: ContactInfo,
    pub all_links: Vec<String>,
}

pub fn is_contact_like(line: &str) -> bool {
    CONTACT_LIKE.is_match(&line.to_lowercase())
}

/// First email address in `text`
pub fn find_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// First phone number in `text`, reduced to an optional `+` and digits
pub fn find_phone(text: &str) -> Option<String> {
    PHONE.find(text).map(|m| normalize_phone(m.as_str()))
}

pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed.starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

/// Links in document order, deduplicated
pub fn find_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    LINK.find_iter(text)
        .map(|m| m.as_str().trim_end_matches([',', ';', ')', '.']).to_string())
        .filter(|link| !link.is_empty() && seen.insert(link.clone()))
        .collect()
}

pub struct IdentityExtractor {
    primary: Option<Arc<dyn TokenClassifier>>,
    secondary: Option<Arc<dyn TokenClassifier>>,
    header_lines: usize,
    name_scan_lines: usize,
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityExtractor {
    /// Heuristics only, no NER models
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            header_lines: DEFAULT_HEADER_LINES,
            name_scan_lines: DEFAULT_NAME_SCAN_LINES,
        }
    }

    pub fn with_primary_ner(mut self, classifier: Arc<dyn TokenClassifier>) -> Self {
        self.primary = Some(classifier);
        self
    }

    pub fn with_secondary_ner(mut self, classifier: Arc<dyn TokenClassifier>) -> Self {
        self.secondary = Some(classifier);
        self
    }

    pub fn with_scan_limits(mut self, header_lines: usize, name_scan_lines: usize) -> Self {
        self.header_lines = header_lines;
        self.name_scan_lines = name_scan_lines;
        self
    }

    pub fn extract(&self, lines: &[String], warnings: &mut Vec<ExtractionWarning>) -> Identity {
        let name = self.extract_name(lines, warnings);
        let title = self.extract_title(lines);
        let contact = self.extract_contact(lines, name.as_deref());
        let all_links = find_links(&lines.join("\n"));

        Identity {
            name,
            title,
            contact,
            all_links,
        }
    }

    /// NER over the first line (primary, then secondary), then the capitalised-line heuristic
    pub fn extract_name(&self, lines: &[String], warnings: &mut Vec<ExtractionWarning>) -> Option<String> {
        let first_line = lines.first()?;

        for classifier in [&self.primary, &self.secondary].into_iter().flatten() {
            match classifier.classify(first_line) {
                Ok(entities) => {
                    let person = entities
                        .into_iter()
                        .find(|e| e.kind == EntityKind::Person)
                        .map(|e| e.text.replace("##", "").trim().to_string())
                        .filter(|name| !name.is_empty());
                    if let Some(name) = person {
                        log::debug!("Name found by {}: {}", classifier.name(), name);
                        return Some(name);
                    }
                }
                Err(e) => {
                    log::warn!("Name NER with {} failed, skipping: {}", classifier.name(), e);
                    warnings.push(ExtractionWarning::SignalFailed {
                        signal: format!("name-ner:{}", classifier.name()),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.heuristic_name(lines)
    }

    pub fn heuristic_name(&self, lines: &[String]) -> Option<String> {
        lines
            .iter()
            .take(self.name_scan_lines)
            .map(|line| line.trim())
            .find(|line| !is_heading(line) && !is_contact_like(line) && looks_like_name(line))
            .map(str::to_string)
    }

    /// First line after the first with more than five words that is not a heading or contact line
    pub fn extract_title(&self, lines: &[String]) -> Option<String> {
        lines
            .iter()
            .skip(1)
            .find(|line| {
                line.split_whitespace().count() > 5 && !is_heading(line) && !is_contact_like(line)
            })
            .cloned()
    }

    pub fn extract_contact(&self, lines: &[String], name: Option<&str>) -> ContactInfo {
        let header: Vec<&str> = lines.iter().take(self.header_lines).map(String::as_str).collect();
        let block = header.join(" ");

        let before_sections: Vec<&str> = header
            .iter()
            .copied()
            .take_while(|line| !is_heading(line))
            .collect();

        ContactInfo {
            email: find_email(&block),
            phone: find_phone(&block),
            location: find_location(&before_sections, name),
            links: find_links(&block),
        }
    }
}

fn looks_like_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    (2..=4).contains(&words.len())
        && words.iter().all(|w| {
            w.chars().all(char::is_alphabetic) && w.chars().next().is_some_and(char::is_uppercase)
        })
}

/// First `City, ST` or `City, Country` segment in the header lines above the first section
fn find_location(header: &[&str], name: Option<&str>) -> Option<String> {
    header
        .iter()
        .flat_map(|line| line.split(['|', '•', '·']))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| Some(*segment) != name)
        .filter(|segment| !is_contact_like(segment) && !is_heading(segment))
        .filter(|segment| !ROLE_WORD.is_match(segment))
        .find(|segment| LOCATION.is_match(segment))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ner::testing::{entity, FailingClassifier, FixedClassifier};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_heuristic_name_skips_contact_and_headings() {
        let doc = lines(&["john@x.com | 555-123-4567", "SUMMARY", "Jane Ann Doe", "Engineer"]);
        let extractor = IdentityExtractor::new();
        let mut warnings = Vec::new();
        assert_eq!(extractor.extract_name(&doc, &mut warnings), Some("Jane Ann Doe".to_string()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_heuristic_name_rejects_non_names() {
        let extractor = IdentityExtractor::new();
        assert_eq!(extractor.heuristic_name(&lines(&["Resume"])), None);
        assert_eq!(extractor.heuristic_name(&lines(&["john smith"])), None);
        assert_eq!(extractor.heuristic_name(&lines(&["R2 D2"])), None);
        assert_eq!(
            extractor.heuristic_name(&lines(&["Senior Software Engineer At Big Co"])),
            None
        );
    }

    #[test]
    fn test_name_scan_is_limited_to_leading_lines() {
        let doc = lines(&["a", "b", "c", "d", "e", "Jane Doe"]);
        assert_eq!(IdentityExtractor::new().heuristic_name(&doc), None);
    }

    #[test]
    fn test_ner_chain_prefers_primary_then_secondary() {
        let doc = lines(&["Resume of Johnathan Smith"]);
        let primary = Arc::new(FixedClassifier(vec![entity("Acme", EntityKind::Organization)]));
        let secondary = Arc::new(FixedClassifier(vec![entity("Johnathan Smith", EntityKind::Person)]));

        let extractor = IdentityExtractor::new()
            .with_primary_ner(primary)
            .with_secondary_ner(secondary);
        let mut warnings = Vec::new();
        assert_eq!(
            extractor.extract_name(&doc, &mut warnings),
            Some("Johnathan Smith".to_string())
        );
    }

    #[test]
    fn test_failing_ner_falls_back_to_heuristic() {
        let doc = lines(&["Jane Doe", "jane@example.com"]);
        let extractor = IdentityExtractor::new().with_primary_ner(Arc::new(FailingClassifier));

        let mut warnings = Vec::new();
        assert_eq!(extractor.extract_name(&doc, &mut warnings), Some("Jane Doe".to_string()));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_title_requires_more_than_five_words() {
        let doc = lines(&[
            "Jane Doe",
            "Engineer",
            "jane@example.com | github.com/jane | 555 123 4567 and more",
            "Backend engineer building payment systems at scale",
        ]);
        assert_eq!(
            IdentityExtractor::new().extract_title(&doc),
            Some("Backend engineer building payment systems at scale".to_string())
        );
    }

    #[test]
    fn test_contact_fields() {
        let doc = lines(&[
            "Jane Doe",
            "Austin, TX | jane.doe@example.com | +1 (512) 555-0147",
            "https://linkedin.com/in/janedoe, www.janedoe.dev",
        ]);
        let contact = IdentityExtractor::new().extract_contact(&doc, Some("Jane Doe"));

        assert_eq!(contact.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(contact.phone.as_deref(), Some("+15125550147"));
        assert_eq!(contact.location.as_deref(), Some("Austin, TX"));
        assert_eq!(
            contact.links,
            vec!["https://linkedin.com/in/janedoe", "www.janedoe.dev"]
        );
    }

    #[test]
    fn test_location_ignores_section_bodies() {
        let doc = lines(&["Jane Doe", "jane@example.com", "SKILLS", "Python, Java"]);
        let contact = IdentityExtractor::new().extract_contact(&doc, Some("Jane Doe"));
        assert_eq!(contact.location, None);
        assert_eq!(contact.email.as_deref(), Some("jane@example.com"));

        let doc = lines(&["Jane Doe", "EXPERIENCE", "Backend Engineer, Google", "Austin, TX"]);
        let contact = IdentityExtractor::new().extract_contact(&doc, Some("Jane Doe"));
        assert_eq!(contact.location, None);
    }

    #[test]
    fn test_location_skips_role_and_company_segments() {
        let doc = lines(&["Jane Doe", "Backend Engineer, Google | Seattle, WA"]);
        let contact = IdentityExtractor::new().extract_contact(&doc, Some("Jane Doe"));
        assert_eq!(contact.location.as_deref(), Some("Seattle, WA"));
    }

    #[test]
    fn test_contact_scan_is_limited_to_header() {
        let mut raw = vec!["Jane Doe".to_string()];
        raw.extend((0..12).map(|i| format!("filler line {}", i)));
        raw.push("late@example.com".to_string());

        let contact = IdentityExtractor::new().extract_contact(&raw, None);
        assert!(contact.email.is_none());
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(find_phone("Call 555-123-4567 today"), Some("5551234567".to_string()));
        assert_eq!(find_phone("9876543210"), Some("9876543210".to_string()));
        assert_eq!(normalize_phone("+44 20 7946 0958"), "+442079460958");
        assert_eq!(find_phone("no digits"), None);
    }

    #[test]
    fn test_links_are_deduplicated_in_order() {
        let links = find_links("github.com/jane https://x.io github.com/jane");
        assert_eq!(links, vec!["github.com/jane", "https://x.io"]);
    }
}

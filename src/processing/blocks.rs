//! Per-section block parsers turning captured lines into typed records

use crate::processing::sections::is_heading;
use crate::processing::skills::SkillEngine;
use crate::profile::{CertificationEntry, EducationEntry, ExperienceEntry, ExtractionWarning, ProjectEntry};
use regex::Regex;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("Invalid year regex"));

static MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b",
    )
    .expect("Invalid month regex")
});

static PROJECT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z].* - .*").expect("Invalid project title regex"));

const BULLET_MARKERS: &[char] = &['•', '●', '▪', '◦', '‣', '*', '-', '–'];

/// True when `s` contains a four-digit run or a month name
pub fn is_date_like(s: &str) -> bool {
    YEAR.is_match(s) || MONTH.is_match(s)
}

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLET_MARKERS)
}

fn strip_bullet(line: &str) -> String {
    line.trim_start_matches(|c: char| BULLET_MARKERS.contains(&c) || c.is_whitespace())
        .trim()
        .to_string()
}

fn non_empty(line: &str) -> Option<String> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Shared state handed to every block parser
pub struct ParseContext<'a> {
    pub skills: &'a SkillEngine,
    pub warnings: &'a mut Vec<ExtractionWarning>,
}

impl<'a> ParseContext<'a> {
    pub fn new(skills: &'a SkillEngine, warnings: &'a mut Vec<ExtractionWarning>) -> Self {
        Self { skills, warnings }
    }
}

/// Turns the lines captured under one section into records
pub trait BlockParser<T>: Send + Sync {
    fn parse(&self, lines: &[String], ctx: &mut ParseContext<'_>) -> Vec<T>;
}

/// Greedy (institution, degree, date-or-extra) triples
#[derive(Debug, Default, Clone, Copy)]
pub struct EducationTripleParser;

impl BlockParser<EducationEntry> for EducationTripleParser {
    fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<EducationEntry> {
        let mut entries = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let institution = non_empty(&lines[i]);
            let degree = lines.get(i + 1).and_then(|l| non_empty(l));
            let date = lines
                .get(i + 2)
                .filter(|l| is_date_like(l))
                .and_then(|l| non_empty(l));

            entries.push(EducationEntry {
                institution,
                degree,
                date,
            });

            i += match lines.len() - i {
                1 => 1,
                2 => 2,
                _ => 3,
            };
        }

        entries
    }
}

/// Company, role, date seed blocks found by lookahead on the date line
#[derive(Debug, Default, Clone, Copy)]
pub struct ExperienceScanParser;

impl ExperienceScanParser {
    fn starts_block(lines: &[String], i: usize) -> bool {
        i + 2 < lines.len()
            && !is_heading(&lines[i])
            && !is_heading(&lines[i + 1])
            && is_date_like(&lines[i + 2])
    }

    fn flush(block: &[String], ctx: &mut ParseContext<'_>) -> Option<ExperienceEntry> {
        if block.is_empty() {
            return None;
        }

        let customer = block.first().and_then(|l| non_empty(l));
        let role = block.get(1).and_then(|l| non_empty(l));
        let mut dates = None;
        let mut free_text: Vec<&str> = Vec::new();

        if let Some(third) = block.get(2) {
            if is_date_like(third) {
                dates = non_empty(third);
            } else {
                free_text.push(third);
            }
        }
        free_text.extend(block.iter().skip(3).map(String::as_str));

        let technology = ctx
            .skills
            .extract_with_warnings(&free_text.join(" "), ctx.warnings)
            .titled();

        Some(ExperienceEntry {
            customer,
            role,
            dates,
            technology,
            ..Default::default()
        })
    }
}

impl BlockParser<ExperienceEntry> for ExperienceScanParser {
    fn parse(&self, lines: &[String], ctx: &mut ParseContext<'_>) -> Vec<ExperienceEntry> {
        let mut entries = Vec::new();
        let mut block: Vec<String> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if Self::starts_block(lines, i) {
                if let Some(entry) = Self::flush(&block, ctx) {
                    entries.push(entry);
                }
                block = lines[i..i + 3].to_vec();
                i += 3;
            } else {
                block.push(lines[i].clone());
                i += 1;
            }
        }

        if let Some(entry) = Self::flush(&block, ctx) {
            entries.push(entry);
        }

        entries
    }
}

/// Title, optional date line, description up to the next `Name - Something` line
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectParser;

impl BlockParser<ProjectEntry> for ProjectParser {
    fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<ProjectEntry> {
        let mut projects = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let title = lines[i].trim().to_string();
            i += 1;

            let date = match lines.get(i) {
                Some(line) if is_date_like(line) => {
                    i += 1;
                    non_empty(line)
                }
                _ => None,
            };

            let mut description = Vec::new();
            while i < lines.len() && !is_heading(&lines[i]) && !PROJECT_TITLE.is_match(&lines[i]) {
                description.push(lines[i].trim());
                i += 1;
            }

            projects.push(ProjectEntry {
                title,
                date,
                description: description.join(" "),
            });
        }

        projects
    }
}

/// Bullet-delimited sub-blocks, or a single title with the remaining lines as details
#[derive(Debug, Default, Clone, Copy)]
pub struct CertificationParser;

impl BlockParser<CertificationEntry> for CertificationParser {
    fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<CertificationEntry> {
        let lines: Vec<&String> = lines.iter().filter(|l| !is_heading(l)).collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let mut blocks: Vec<Vec<String>> = Vec::new();
        if lines.iter().any(|l| is_bullet(l)) {
            for line in lines {
                if is_bullet(line) || blocks.is_empty() {
                    blocks.push(vec![strip_bullet(line)]);
                } else if let Some(block) = blocks.last_mut() {
                    block.push(line.trim().to_string());
                }
            }
        } else {
            blocks.push(lines.iter().map(|l| l.trim().to_string()).collect());
        }

        blocks
            .into_iter()
            .filter_map(|block| {
                let (title, details) = block.split_first()?;
                Some(CertificationEntry {
                    title: title.clone(),
                    details: details.join(" "),
                })
            })
            .filter(|cert| !cert.title.is_empty())
            .collect()
    }
}

/// One bullet string per non-empty line
#[derive(Debug, Default, Clone, Copy)]
pub struct AchievementParser;

impl BlockParser<String> for AchievementParser {
    fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<String> {
        lines
            .iter()
            .map(|line| strip_bullet(line))
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Objective lines joined into a single paragraph
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryParser;

impl BlockParser<String> for SummaryParser {
    fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<String> {
        let summary = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if summary.is_empty() {
            Vec::new()
        } else {
            vec![summary]
        }
    }
}

/// One replaceable parser per section type
pub struct BlockParsers {
    pub education: Box<dyn BlockParser<EducationEntry>>,
    pub experience: Box<dyn BlockParser<ExperienceEntry>>,
    pub projects: Box<dyn BlockParser<ProjectEntry>>,
    pub certifications: Box<dyn BlockParser<CertificationEntry>>,
    pub achievements: Box<dyn BlockParser<String>>,
    pub summary: Box<dyn BlockParser<String>>,
}

impl Default for BlockParsers {
    fn default() -> Self {
        Self {
            education: Box::new(EducationTripleParser),
            experience: Box::new(ExperienceScanParser),
            projects: Box::new(ProjectParser),
            certifications: Box::new(CertificationParser),
            achievements: Box::new(AchievementParser),
            summary: Box::new(SummaryParser),
        }
    }
}

impl BlockParsers {
    pub fn with_education(mut self, parser: impl BlockParser<EducationEntry> + 'static) -> Self {
        self.education = Box::new(parser);
        self
    }

    pub fn with_experience(mut self, parser: impl BlockParser<ExperienceEntry> + 'static) -> Self {
        self.experience = Box::new(parser);
        self
    }

    pub fn with_projects(mut self, parser: impl BlockParser<ProjectEntry> + 'static) -> Self {
        self.projects = Box::new(parser);
        self
    }

    pub fn with_certifications(mut self, parser: impl BlockParser<CertificationEntry> + 'static) -> Self {
        self.certifications = Box::new(parser);
        self
    }

    pub fn with_achievements(mut self, parser: impl BlockParser<String> + 'static) -> Self {
        self.achievements = Box::new(parser);
        self
    }

    pub fn with_summary(mut self, parser: impl BlockParser<String> + 'static) -> Self {
        self.summary = Box::new(parser);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::vocabulary::KeywordDictionary;
    use std::sync::Arc;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn engine() -> SkillEngine {
        SkillEngine::new(Arc::new(KeywordDictionary::from_terms(["python", "go", "rust"]))).unwrap()
    }

    #[test]
    fn test_date_heuristic() {
        assert!(is_date_like("2020"));
        assert!(is_date_like("Jan 2020"));
        assert!(is_date_like("March 2019 - Dec 2021"));
        assert!(is_date_like("sept to november"));
        assert!(!is_date_like("Senior Software Engineer"));
        assert!(!is_date_like("Managed a team of 5"));
        assert!(!is_date_like("Marketing Janitor"));
    }

    #[test]
    fn test_education_triple() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let entries = EducationTripleParser.parse(&lines(&["MIT", "BS Computer Science", "2018"]), &mut ctx);
        assert_eq!(
            entries,
            vec![EducationEntry {
                institution: Some("MIT".to_string()),
                degree: Some("BS Computer Science".to_string()),
                date: Some("2018".to_string()),
            }]
        );
    }

    #[test]
    fn test_education_extra_line_and_tail() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let entries = EducationTripleParser.parse(
            &lines(&["Stanford", "MS CS", "GPA 3.9", "Community College", "AA"]),
            &mut ctx,
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, None);
        assert_eq!(entries[1].institution.as_deref(), Some("Community College"));
        assert_eq!(entries[1].degree.as_deref(), Some("AA"));
    }

    #[test]
    fn test_experience_two_blocks() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let entries = ExperienceScanParser.parse(
            &lines(&[
                "Acme Corp",
                "Engineer",
                "2019",
                "Built X using Python and Go",
                "Beta Inc",
                "Lead",
                "2021",
            ]),
            &mut ctx,
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].customer.as_deref(), Some("Acme Corp"));
        assert_eq!(entries[0].role.as_deref(), Some("Engineer"));
        assert_eq!(entries[0].dates.as_deref(), Some("2019"));
        assert_eq!(entries[0].technology, vec!["Go", "Python"]);

        assert_eq!(entries[1].customer.as_deref(), Some("Beta Inc"));
        assert_eq!(entries[1].role.as_deref(), Some("Lead"));
        assert_eq!(entries[1].dates.as_deref(), Some("2021"));
        assert!(entries[1].technology.is_empty());
    }

    #[test]
    fn test_experience_without_date_keeps_text_as_free_text() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let entries =
            ExperienceScanParser.parse(&lines(&["Freelance", "Developer", "Shipped Rust services"]), &mut ctx);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].dates, None);
        assert_eq!(entries[0].technology, vec!["Rust"]);
    }

    #[test]
    fn test_projects() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let projects = ProjectParser.parse(
            &lines(&[
                "Resume Parser - NLP tool",
                "Jan 2023",
                "Extracted fields from resumes.",
                "Built with Rust.",
                "Chat App - Realtime messaging",
                "Websocket server",
            ]),
            &mut ctx,
        );

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].date.as_deref(), Some("Jan 2023"));
        assert_eq!(projects[0].description, "Extracted fields from resumes. Built with Rust.");
        assert_eq!(projects[1].title, "Chat App - Realtime messaging");
        assert_eq!(projects[1].date, None);
        assert_eq!(projects[1].description, "Websocket server");
    }

    #[test]
    fn test_certifications_with_and_without_bullets() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let bulleted = CertificationParser.parse(
            &lines(&["• AWS Solutions Architect", "Amazon, 2022", "• CKA", "CNCF"]),
            &mut ctx,
        );
        assert_eq!(bulleted.len(), 2);
        assert_eq!(bulleted[0].title, "AWS Solutions Architect");
        assert_eq!(bulleted[0].details, "Amazon, 2022");
        assert_eq!(bulleted[1].title, "CKA");

        let plain = CertificationParser.parse(&lines(&["PMP", "PMI", "2020"]), &mut ctx);
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].details, "PMI 2020");
    }

    #[test]
    fn test_achievements_and_summary() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let achievements = AchievementParser.parse(&lines(&["• Hackathon winner", "- Dean's list"]), &mut ctx);
        assert_eq!(achievements, vec!["Hackathon winner", "Dean's list"]);

        let summary = SummaryParser.parse(&lines(&["Backend engineer.", "Loves Rust."]), &mut ctx);
        assert_eq!(summary, vec!["Backend engineer. Loves Rust."]);
        assert!(SummaryParser.parse(&[], &mut ctx).is_empty());
    }

    struct SingleEntryParser;

    impl BlockParser<EducationEntry> for SingleEntryParser {
        fn parse(&self, lines: &[String], _ctx: &mut ParseContext<'_>) -> Vec<EducationEntry> {
            vec![EducationEntry {
                institution: Some(lines.join(" / ")),
                ..Default::default()
            }]
        }
    }

    #[test]
    fn test_parsers_are_replaceable() {
        let engine = engine();
        let mut warnings = Vec::new();
        let mut ctx = ParseContext::new(&engine, &mut warnings);

        let parsers = BlockParsers::default().with_education(SingleEntryParser);
        let entries = parsers.education.parse(&lines(&["MIT", "BS", "2018", "Harvard"]), &mut ctx);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].institution.as_deref(), Some("MIT / BS / 2018 / Harvard"));
    }
}

//! Section heading vocabulary and line segmentation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Education,
    Skills,
    Experience,
    Projects,
    Certifications,
    Achievements,
    Objective,
}

const EXPERIENCE_HEADINGS: &[&str] = &[
    "EXPERIENCE",
    "EXPERIENCES",
    "WORK EXPERIENCE",
    "WORK",
    "WORK HISTORY",
    "PROFESSIONAL EXPERIENCE",
    "EMPLOYMENT",
    "EMPLOYMENT HISTORY",
    "CAREER HISTORY",
];

const EDUCATION_HEADINGS: &[&str] = &[
    "EDUCATION",
    "EDUCATIONAL QUALIFICATION",
    "ACADEMICS",
    "ACADEMIC BACKGROUND",
    "EDUCATIONAL BACKGROUND",
    "QUALIFICATIONS",
];

const SKILLS_HEADINGS: &[&str] = &[
    "SKILLS",
    "TECHNICAL SKILLS",
    "TECHNICAL EXPERTISE",
    "SKILL SET",
    "CORE COMPETENCIES",
    "AREAS OF EXPERTISE",
];

const PROJECTS_HEADINGS: &[&str] = &[
    "PROJECTS",
    "PERSONAL PROJECTS",
    "ACADEMIC PROJECTS",
    "PROJECT EXPERIENCE",
    "PROJECT WORK",
];

const CERTIFICATIONS_HEADINGS: &[&str] = &[
    "CERTIFICATIONS",
    "CERTIFICATION",
    "LICENSES",
    "LICENSE",
    "PROFESSIONAL CERTIFICATIONS",
];

const ACHIEVEMENTS_HEADINGS: &[&str] = &[
    "ACHIEVEMENTS",
    "AWARDS",
    "HONORS",
    "HONOURS",
    "RECOGNITION",
    "ACCOMPLISHMENTS",
];

const OBJECTIVE_HEADINGS: &[&str] = &[
    "OBJECTIVE",
    "CAREER OBJECTIVE",
    "PROFESSIONAL OBJECTIVE",
    "SUMMARY",
    "PROFILE SUMMARY",
    "PROFESSIONAL SUMMARY",
];

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Experience,
        SectionKind::Projects,
        SectionKind::Certifications,
        SectionKind::Achievements,
        SectionKind::Objective,
    ];

    pub fn headings(&self) -> &'static [&'static str] {
        match self {
            SectionKind::Education => EDUCATION_HEADINGS,
            SectionKind::Skills => SKILLS_HEADINGS,
            SectionKind::Experience => EXPERIENCE_HEADINGS,
            SectionKind::Projects => PROJECTS_HEADINGS,
            SectionKind::Certifications => CERTIFICATIONS_HEADINGS,
            SectionKind::Achievements => ACHIEVEMENTS_HEADINGS,
            SectionKind::Objective => OBJECTIVE_HEADINGS,
        }
    }

    /// Canonical kind for a heading line, exact match on the upper-cased trimmed text
    pub fn from_heading(line: &str) -> Option<SectionKind> {
        let upper = line.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.headings().contains(&upper.as_str()))
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionKind::Education => "education",
            SectionKind::Skills => "skills",
            SectionKind::Experience => "experience",
            SectionKind::Projects => "projects",
            SectionKind::Certifications => "certifications",
            SectionKind::Achievements => "achievements",
            SectionKind::Objective => "objective",
        };
        f.write_str(label)
    }
}

pub fn is_heading(line: &str) -> bool {
    SectionKind::from_heading(line).is_some()
}

/// Lines grouped under the section heading that precedes them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    sections: BTreeMap<SectionKind, Vec<String>>,
}

impl Sections {
    /// Lines for `kind`, empty when the document has no such section
    pub fn get(&self, kind: SectionKind) -> &[String] {
        self.sections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.sections.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.sections.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }
}

/// Attribute each line to the most recent heading; lines before the first heading are dropped
pub fn segment<S: AsRef<str>>(lines: &[S]) -> Sections {
    let mut sections: BTreeMap<SectionKind, Vec<String>> = BTreeMap::new();
    let mut current: Option<SectionKind> = None;

    for line in lines {
        let line = line.as_ref();
        if let Some(kind) = SectionKind::from_heading(line) {
            sections.entry(kind).or_default();
            current = Some(kind);
        } else if let Some(kind) = current {
            sections.entry(kind).or_default().push(line.to_string());
        }
    }

    log::debug!(
        "Segmented {} lines into sections: {:?}",
        lines.len(),
        sections.iter().map(|(k, v)| (k, v.len())).collect::<Vec<_>>()
    );

    Sections { sections }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_detection_is_exact() {
        assert!(is_heading("Education"));
        assert!(is_heading("  WORK EXPERIENCE "));
        assert!(is_heading("technical skills"));
        assert!(!is_heading("Education:"));
        assert!(!is_heading("My Education"));
        assert_eq!(SectionKind::from_heading("Honours"), Some(SectionKind::Achievements));
        assert_eq!(SectionKind::from_heading("profile summary"), Some(SectionKind::Objective));
    }

    #[test]
    fn test_segment_attributes_lines() {
        let lines = ["John Smith", "EDUCATION", "MIT", "BSc CS", "2018", "SKILLS", "Python, Java"];
        let sections = segment(&lines);

        assert_eq!(sections.get(SectionKind::Education), &["MIT", "BSc CS", "2018"]);
        assert_eq!(sections.get(SectionKind::Skills), &["Python, Java"]);
        assert!(sections.get(SectionKind::Experience).is_empty());
    }

    #[test]
    fn test_segment_merges_same_kind_headings() {
        let lines = [
            "WORK EXPERIENCE",
            "Acme",
            "EDUCATION",
            "MIT",
            "EMPLOYMENT HISTORY",
            "Globex",
        ];
        let sections = segment(&lines);

        assert_eq!(sections.get(SectionKind::Experience), &["Acme", "Globex"]);
        assert_eq!(sections.get(SectionKind::Education), &["MIT"]);
    }

    #[test]
    fn test_lines_before_first_heading_are_unattributed() {
        let lines = ["Jane Doe", "jane@example.com"];
        let sections = segment(&lines);
        assert!(sections.is_empty());
        assert_eq!(sections.kinds().count(), 0);
    }
}

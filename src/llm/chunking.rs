//! Splitting a document into a head and experience batches for the chunked fallback

use crate::processing::sections::SectionKind;
use regex::Regex;
use std::sync::LazyLock;

static ENTRY_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:client|customer|company|employer|project|organi[sz]ation)\s*:")
        .expect("Invalid entry boundary regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Identity region sent to the head prompt
    pub head: String,
    /// Experience batches, each holding up to `chunk_size` units
    pub chunks: Vec<String>,
}

fn is_experience_heading(line: &str) -> bool {
    SectionKind::from_heading(line) == Some(SectionKind::Experience)
}

pub fn is_entry_boundary(line: &str) -> bool {
    ENTRY_BOUNDARY.is_match(line)
}

/// Head is everything before the first experience heading, or the first
/// `head_line_limit` lines when the document has none.
pub fn plan_chunks(lines: &[String], head_line_limit: usize, chunk_size: usize) -> ChunkPlan {
    let split_at = lines
        .iter()
        .position(|line| is_experience_heading(line))
        .unwrap_or_else(|| head_line_limit.min(lines.len()));

    let (head, rest) = lines.split_at(split_at);
    let units = experience_units(rest);

    let chunks = units
        .chunks(chunk_size.max(1))
        .map(|batch| batch.join("\n"))
        .collect();

    ChunkPlan {
        head: head.join("\n"),
        chunks,
    }
}

/// Units start at experience headings and entry-boundary lines
fn experience_units(lines: &[String]) -> Vec<String> {
    let mut units: Vec<Vec<&str>> = Vec::new();

    for line in lines {
        let starts_unit = is_experience_heading(line) || is_entry_boundary(line);
        match units.last_mut() {
            Some(unit) if !starts_unit => unit.push(line.as_str()),
            _ => units.push(vec![line.as_str()]),
        }
    }

    units
        .into_iter()
        .filter(|unit| !unit.iter().all(|line| is_experience_heading(line)))
        .map(|unit| unit.join("\n"))
        .collect()
}

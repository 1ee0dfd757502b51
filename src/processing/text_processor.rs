//! Text cleaning, tokenization and casing helpers shared by the parsers

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static GAINED_EXPERIENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgained (hands-on )?experience\b").expect("Invalid filler regex"));

static FILLER_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(used|working with|exposure to|familiar with|experience in)\b")
        .expect("Invalid filler regex")
});

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.\-]").expect("Invalid character class regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Lower-case, drop filler phrases and punctuation, collapse whitespace
pub fn clean_text(text: &str) -> String {
    let lowered = normalize_unicode(text).to_lowercase();
    let cleaned = GAINED_EXPERIENCE.replace_all(&lowered, "");
    let cleaned = FILLER_PHRASES.replace_all(&cleaned, "");
    let cleaned = DISALLOWED_CHARS.replace_all(&cleaned, "");
    collapse_whitespace(&cleaned)
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Map typographic punctuation to its ASCII form
pub fn normalize_unicode(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            _ => c,
        })
        .collect()
}

/// Upper-case the first cased character of every run, lower-case the rest.
///
/// A run restarts after any character that is not alphabetic, so
/// `"node.js"` becomes `"Node.Js"` and `"3d modeling"` becomes `"3D Modeling"`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_cased = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_cased {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            result.push(c);
            previous_cased = false;
        }
    }

    result
}

pub struct TextProcessor {
    stop_words: HashSet<&'static str>,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        Self {
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Lower-cased word tokens with stop words and single characters removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|w| w.to_lowercase())
            .filter(|w| w.chars().count() > 1)
            .filter(|w| !self.is_stop_word(w))
            .collect()
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "etc", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me", "more", "most",
    "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "per", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "within", "without", "would", "you", "your", "yours", "yourself", "yourselves",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_removes_filler_phrases() {
        let cleaned = clean_text("Gained hands-on experience with Docker; used Python & Rust!");
        assert_eq!(cleaned, "with docker python rust");
    }

    #[test]
    fn test_clean_text_keeps_dots_and_hyphens() {
        let cleaned = clean_text("Node.js,   CI-CD   (GitHub)");
        assert_eq!(cleaned, "node.js ci-cd github");
    }

    #[test]
    fn test_title_case_matches_python_semantics() {
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("node.js"), "Node.Js");
        assert_eq!(title_case("c++"), "C++");
        assert_eq!(title_case("ci/cd"), "Ci/Cd");
        assert_eq!(title_case("AWS"), "Aws");
        assert_eq!(title_case("3d printing"), "3D Printing");
    }

    #[test]
    fn test_tokenization_filters_stop_words() {
        let processor = TextProcessor::new();
        let tokens = processor.tokenize("Built the APIs in Rust and Go with a team");

        assert_eq!(tokens, vec!["built", "apis", "rust", "go", "team"]);
    }
}

//! Recovering a JSON object from free-form model output

use crate::error::{Result, ResumeParserError};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("Invalid code fence regex"));

/// First balanced `{...}` span, ignoring braces inside string literals
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop trailing commas before `}`/`]`, leading commas after `{`/`[` and repeated commas
pub fn remove_stray_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut after_open = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if after_open || matches!(next, Some('}') | Some(']') | Some(',')) {
                    continue;
                }
                out.push(c);
            }
            '{' | '[' => {
                out.push(c);
                after_open = true;
                continue;
            }
            '"' => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }

        if !c.is_whitespace() {
            after_open = false;
        }
    }
    out
}

/// Extract and repair the first JSON object in `raw`
pub fn repair_json(raw: &str) -> Result<String> {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    let span = first_json_object(&unfenced)
        .ok_or_else(|| ResumeParserError::JsonRepair("no JSON object in model output".to_string()))?;
    Ok(remove_stray_commas(span))
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let repaired = repair_json(raw)?;
    serde_json::from_str(&repaired).map_err(|e| ResumeParserError::JsonRepair(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_trailing_commas_removed() {
        assert_eq!(repair_json(r#"{"a":1,"b":[1,2,],}"#).unwrap(), r#"{"a":1,"b":[1,2]}"#);
    }

    #[test]
    fn test_leading_and_duplicate_commas() {
        let value: Value = parse_json(r#"{ , "a": [ ,1,, 2], "b": "x"}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": "x"}));
    }

    #[test]
    fn test_commas_inside_strings_survive() {
        let value: Value = parse_json(r#"{"role": "Lead, Platform ,}", "x": "a\"b,]"}"#).unwrap();
        assert_eq!(value["role"], "Lead, Platform ,}");
        assert_eq!(value["x"], "a\"b,]");
    }

    #[test]
    fn test_object_inside_prose_and_fences() {
        let raw = "Sure! Here is the data:\n```json\n{\"full_name\": \"Jane {Doe}\"}\n```\nAnything else?";
        let value: Value = parse_json(raw).unwrap();
        assert_eq!(value["full_name"], "Jane {Doe}");
    }

    #[test]
    fn test_unrecoverable_output() {
        assert!(matches!(parse_json::<Value>("no json here"), Err(ResumeParserError::JsonRepair(_))));
        assert!(matches!(parse_json::<Value>("{\"a\": "), Err(ResumeParserError::JsonRepair(_))));
        assert!(matches!(parse_json::<Value>("{\"a\" 1}"), Err(ResumeParserError::JsonRepair(_))));
    }
}

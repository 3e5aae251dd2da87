//! Parsing of structured gateway output.
//!
//! Output may arrive wrapped in markdown fences, prefixed with prose, or cut
//! off mid-structure when the token budget runs out. [`parse_structured`]
//! tries a direct parse first and, only when that fails and the text looks
//! structured, performs exactly one repair pass that closes whatever is
//! still open.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedResponse {
    #[error("Response contains no structured content")]
    NoStructure,

    #[error("Response could not be parsed after repair: {source}")]
    RepairFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Structured response carried no usable content")]
    Empty,
}

fn fence_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*(?:```|$)").ok())
        .as_ref()
}

fn field_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#""[A-Za-z_][A-Za-z0-9_]*"\s*:"#).ok())
        .as_ref()
}

/// Strip markdown fences and leading prose, keeping the text from the first
/// opening bracket or brace onwards.
pub fn extract_candidate(raw: &str) -> &str {
    let trimmed = raw.trim();

    let unfenced = fence_pattern()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    match unfenced.find(['{', '[']) {
        Some(start) => &unfenced[start..],
        None => unfenced,
    }
}

fn has_structure(candidate: &str) -> bool {
    candidate.starts_with(['{', '['])
        || field_name_pattern().is_some_and(|re| re.is_match(candidate))
}

/// Parse the first JSON value in `text`, ignoring anything after it
fn parse_direct<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<T>();
    match stream.next() {
        Some(result) => result,
        None => serde_json::from_str(text),
    }
}

/// Close an unterminated string, drop a dangling comma and append the
/// closing tokens for every bracket or brace still open.
///
/// Balanced input is returned unchanged.
pub fn repair(raw: &str) -> String {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    if open.is_empty() && !in_string {
        return raw.to_string();
    }

    let mut repaired = raw.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    } else {
        repaired.truncate(repaired.trim_end().len());
        while repaired.ends_with(',') {
            repaired.pop();
            repaired.truncate(repaired.trim_end().len());
        }
        if repaired.ends_with(':') {
            repaired.push_str(" null");
        }
    }

    repaired.extend(open.iter().rev());
    repaired
}

/// Parse structured gateway output into `T`, with at most one repair attempt
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, MalformedResponse> {
    let candidate = extract_candidate(raw);

    parse_direct(candidate).or_else(|direct_error| {
        if !has_structure(candidate) {
            tracing::debug!(error = %direct_error, "Response has no structured fragments");
            return Err(MalformedResponse::NoStructure);
        }

        tracing::warn!(error = %direct_error, "Direct parse failed, attempting repair");
        let repaired = repair(candidate);
        parse_direct(&repaired).map_err(|source| MalformedResponse::RepairFailed { source })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Deserialize, PartialEq)]
    struct LabelOnly {
        label: String,
    }

    #[test]
    fn test_valid_input_parses_identically() {
        let raw = r#"{"severity": "mild", "possibleConditions": [{"name": "Tension headache", "probability": 0.6}]}"#;

        let direct: Value = serde_json::from_str(raw).unwrap();
        let parsed: Value = parse_structured(raw).unwrap();
        assert_eq!(parsed, direct);

        assert_eq!(repair(raw), raw);
        let repaired: Value = serde_json::from_str(&repair(raw)).unwrap();
        assert_eq!(repaired, direct);
    }

    #[test]
    fn test_missing_two_closing_tokens_is_repaired() {
        let complete = r#"[{"label": "Sharp"}, {"label": "Dull"}]"#;
        let truncated = &complete[..complete.len() - 2];

        let expected: Vec<LabelOnly> = serde_json::from_str(complete).unwrap();
        let parsed: Vec<LabelOnly> = parse_structured(truncated).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_unterminated_string_is_closed() {
        let parsed: Vec<LabelOnly> =
            parse_structured(r#"[{"label": "Sharp"}, {"label": "Throbb"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].label, "Throbb");
    }

    #[test]
    fn test_trailing_comma_is_dropped() {
        let parsed: Value = parse_structured(r#"{"recommendations": ["Rest", "Fluids","#).unwrap();
        assert_eq!(parsed["recommendations"][1], "Fluids");
    }

    #[test]
    fn test_markdown_fence_and_prose_are_stripped() {
        let raw = "Here is the result:\n```json\n{\"complete\": true}\n```";
        let parsed: Value = parse_structured(raw).unwrap();
        assert_eq!(parsed["complete"], true);

        let parsed: Value = parse_structured("Sure! {\"complete\": false} Hope this helps.").unwrap();
        assert_eq!(parsed["complete"], false);
    }

    #[test]
    fn test_plain_prose_has_no_structure() {
        let result = parse_structured::<Value>("I am sorry, I cannot help with that.");
        assert!(matches!(result, Err(MalformedResponse::NoStructure)));
    }

    #[test]
    fn test_unrepairable_input_fails_after_one_attempt() {
        let result = parse_structured::<Value>(r#"{"severity": "mild", "name"}"#);
        assert!(matches!(result, Err(MalformedResponse::RepairFailed { .. })));
    }

    #[test]
    fn test_escaped_quotes_do_not_confuse_repair() {
        let parsed: Value = parse_structured(r#"{"text": "He said \"ouch\" [twice]""#).unwrap();
        assert_eq!(parsed["text"], "He said \"ouch\" [twice]");
    }
}

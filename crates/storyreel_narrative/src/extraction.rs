//! Recovering structured data from free-form model output.
//!
//! Local models rarely answer with bare JSON. They wrap it in markdown fences,
//! preface it with chatter or trail off with commentary. Parsing is a chain of
//! total attempts, first success wins:
//!
//! 1. the whole response as JSON
//! 2. the body of the first fenced code block
//! 3. each balanced `[ ... ]` span, left to right

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^["'“”‘’`]+|["'“”‘’`]+$"#).expect("valid regex"));

/// Parse a JSON array out of a model response.
///
/// Returns `None` when no attempt yields an array. Never panics.
///
/// # Examples
///
/// ```
/// use storyreel_narrative::parse_structured_array;
///
/// let response = "Sure! Here you go:\n```json\n[{\"prompt\": \"a storm\"}]\n```\nEnjoy.";
/// let rows = parse_structured_array(response).unwrap();
/// assert_eq!(rows[0]["prompt"], "a storm");
///
/// assert!(parse_structured_array("no data here").is_none());
/// ```
pub fn parse_structured_array(text: &str) -> Option<Vec<Value>> {
    if let Some(rows) = parse_array(text.trim()) {
        return Some(rows);
    }

    if let Some(rows) = extract_from_code_block(text).and_then(parse_array) {
        tracing::debug!("Recovered array from fenced block");
        return Some(rows);
    }

    let rows = balanced_spans(text, '[', ']').find_map(parse_array);
    if rows.is_some() {
        tracing::debug!("Recovered array from bracket scan");
    } else {
        tracing::debug!(response_length = text.len(), "No array found in response");
    }
    rows
}

/// Strip code fences and surrounding quotes from a single-value answer.
pub(crate) fn unwrap_text(text: &str) -> String {
    let inner = extract_from_code_block(text).unwrap_or(text).trim();
    QUOTES.replace_all(inner, "").trim().to_string()
}

fn parse_array(candidate: &str) -> Option<Vec<Value>> {
    match serde_json::from_str(candidate) {
        Ok(Value::Array(rows)) => Some(rows),
        _ => None,
    }
}

/// Body of the first fenced block, with any language tag dropped.
///
/// An unterminated fence yields everything after it (truncated responses).
fn extract_from_code_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let body_start = text[start..]
        .find('\n')
        .map(|n| start + n + 1)
        .unwrap_or(start);
    let body = match text[body_start..].find("```") {
        Some(end) => &text[body_start..body_start + end],
        None => &text[body_start..],
    };
    Some(body.trim())
}

/// Every balanced `open ... close` span, starting at each `open` in turn.
fn balanced_spans(text: &str, open: char, close: char) -> impl Iterator<Item = &str> {
    text.match_indices(open)
        .filter_map(move |(start, _)| balanced_from(&text[start..], open, close))
}

fn balanced_from(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_array() {
        let rows = parse_structured_array("  [1, 2, 3]\n").unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_direct_object_is_not_an_array() {
        assert!(parse_structured_array(r#"{"shots": 3}"#).is_none());
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Here:\n```json\n[{\"a\": 1}, {\"a\": 2}]\n```";
        assert_eq!(parse_structured_array(text).unwrap().len(), 2);
    }

    #[test]
    fn test_fenced_block_without_closing_fence() {
        let text = "```\n[\"one\", \"two\"]";
        assert_eq!(parse_structured_array(text).unwrap().len(), 2);
    }

    #[test]
    fn test_bracket_scan_skips_non_json_spans() {
        let text = "Notes [draft] follow.\n[{\"prompt\": \"rain [heavy]\"}] -- done";
        let rows = parse_structured_array(text).unwrap();
        assert_eq!(rows[0]["prompt"], "rain [heavy]");
    }

    #[test]
    fn test_bracket_scan_respects_escaped_quotes() {
        let text = r#"Result: [{"prompt": "she said \"go]\" quietly"}] end"#;
        let rows = parse_structured_array(text).unwrap();
        assert_eq!(rows[0]["prompt"], "she said \"go]\" quietly");
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert!(parse_structured_array("[{\"prompt\": \"cut off").is_none());
        assert!(parse_structured_array("").is_none());
    }

    #[test]
    fn test_unwrap_text_strips_fences_and_quotes() {
        assert_eq!(unwrap_text("\"A quiet harbor at dawn.\""), "A quiet harbor at dawn.");
        assert_eq!(unwrap_text("```\nA quiet harbor\n```"), "A quiet harbor");
        assert_eq!(unwrap_text("  plain  "), "plain");
    }
}

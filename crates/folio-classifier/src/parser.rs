//! Decode LLM output into typed structures
//!
//! Two tiers: the extracted JSON object is parsed as-is; if that fails it is
//! repaired once (trailing commas, `//` and `/* */` comments, raw control
//! characters inside strings) and parsed again. A second failure is final.

use crate::error::ClassifierError;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Decode the JSON object contained in `response` into `T`
pub fn decode<T: DeserializeOwned>(what: &'static str, response: &str) -> Result<T, ClassifierError> {
    let json_str = extract_json(what, response)?;

    let first_error = match serde_json::from_str::<T>(&json_str) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    debug!("Strict decode of {} failed ({}), repairing", what, first_error);

    let repaired = repair_json(&json_str);
    serde_json::from_str::<T>(&repaired).map_err(|e| {
        warn!("Lenient decode of {} failed: {}", what, e);
        ClassifierError::Parse {
            what,
            message: format!("{} (strict: {})", e, first_error),
        }
    })
}

/// Extract the outermost JSON object from a response
///
/// Handles markdown code blocks and prose around the object.
pub fn extract_json(what: &'static str, response: &str) -> Result<String, ClassifierError> {
    let trimmed = strip_code_fence(response.trim());

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(trimmed[start..=end].to_string()),
        _ => Err(ClassifierError::Parse {
            what,
            message: "no JSON object in response".to_string(),
        }),
    }
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    // Skip first line (```json or ```) and a closing fence if present
    let body = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return "",
    };
    match body.rfind("```") {
        Some(idx) => &body[..idx],
        None => body,
    }
}

/// Repair common model mistakes in near-JSON text
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
            } else {
                match c {
                    '\\' => {
                        out.push(c);
                        escaped = true;
                    }
                    '"' => {
                        out.push(c);
                        in_string = false;
                    }
                    '\n' => out.push_str("\\n"),
                    '\r' => {}
                    '\t' => out.push_str("\\t"),
                    _ => out.push(c),
                }
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                if !closes_after_trivia(&chars, i + 1) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Whether the next significant character (skipping whitespace and comments)
/// closes an object or array
fn closes_after_trivia(chars: &[char], mut i: usize) -> bool {
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        match (chars.get(i), chars.get(i + 1)) {
            (Some('/'), Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            (Some('/'), Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            (Some('}'), _) | (Some(']'), _) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[test]
    fn test_decode_plain_json() {
        let value: Sample = decode("sample", r#"{"name": "a", "tags": ["x"]}"#).unwrap();
        assert_eq!(value.name, "a");
        assert_eq!(value.tags, vec!["x"]);
    }

    #[test]
    fn test_decode_json_with_markdown_wrapper() {
        let response = "```json\n{\"name\": \"b\"}\n```";
        let value: Sample = decode("sample", response).unwrap();
        assert_eq!(value.name, "b");
    }

    #[test]
    fn test_decode_json_with_prose_around() {
        let response = "Here is the result:\n{\"name\": \"c\"}\nHope it helps!";
        let value: Sample = decode("sample", response).unwrap();
        assert_eq!(value.name, "c");
    }

    #[test]
    fn test_decode_repairs_trailing_commas() {
        let response = r#"{"name": "d", "tags": ["x", "y",],}"#;
        let value: Sample = decode("sample", response).unwrap();
        assert_eq!(value.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_decode_repairs_comments() {
        let response = "{\n  // the name\n  \"name\": \"e\", /* inline */\n  \"tags\": [] // none\n}";
        let value: Sample = decode("sample", response).unwrap();
        assert_eq!(value.name, "e");
    }

    #[test]
    fn test_decode_repairs_newlines_in_strings() {
        let response = "{\"name\": \"line one\nline two\"}";
        let value: Sample = decode("sample", response).unwrap();
        assert_eq!(value.name, "line one\nline two");
    }

    #[test]
    fn test_repair_keeps_slashes_inside_strings() {
        let repaired = repair_json(r#"{"name": "http://x.y/z", "d": "1/2/2024",}"#);
        assert_eq!(repaired, r#"{"name": "http://x.y/z", "d": "1/2/2024"}"#);
    }

    #[test]
    fn test_trailing_comma_before_comment() {
        let repaired = repair_json("[1, 2, // end\n]");
        assert_eq!(repaired.replace(char::is_whitespace, ""), "[1,2]");
    }

    #[test]
    fn test_decode_invalid_json() {
        let result = decode::<Sample>("sample", "This is not JSON");
        assert!(matches!(result, Err(ClassifierError::Parse { .. })));
    }

    #[test]
    fn test_decode_unrepairable_json() {
        let result = decode::<Sample>("sample", r#"{"name": "x" "tags": []}"#);
        assert!(matches!(result, Err(ClassifierError::Parse { .. })));
    }

    #[test]
    fn test_decode_wrong_shape_is_parse_error() {
        let result = decode::<Sample>("sample", r#"{"tags": []}"#);
        assert!(matches!(result, Err(ClassifierError::Parse { .. })));
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        let result = extract_json("sample", "```\n{\"key\": \"value\"}\n```").unwrap();
        assert_eq!(result, r#"{"key": "value"}"#);
    }
}

//! Tolerant parsing of model replies.
//!
//! Local models wrap JSON in prose and code fences; these helpers pull the
//! payload out and leave fallback policy to the callers.

use serde::de::DeserializeOwned;

/// Slices the first `{` .. last `}` span, which survives both markdown
/// fences and leading commentary.
pub(crate) fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

pub(crate) fn parse_json_lenient<T: DeserializeOwned>(response: &str) -> Option<T> {
    let cleaned = response.trim();
    if let Ok(parsed) = serde_json::from_str(cleaned) {
        return Some(parsed);
    }
    let block = extract_json_object(cleaned)?;
    serde_json::from_str(block).ok()
}

/// Extracts fenced code blocks as (language, body) pairs.
pub(crate) fn extract_code_blocks(response: &str) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    let mut rest = response;
    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(newline) = after_open.find('\n') else {
            break;
        };
        let language = after_open[..newline].trim().to_string();
        let body_start = &after_open[newline + 1..];
        let Some(close) = body_start.find("```") else {
            break;
        };
        let body = body_start[..close].trim_end().to_string();
        if !body.is_empty() {
            blocks.push((language, body));
        }
        rest = &body_start[close + 3..];
    }
    blocks
}

/// Splits "KEY: value" lines out of a loosely formatted reply.
pub(crate) fn labeled_line<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let trimmed = line.trim().trim_start_matches(['-', '*', ' ']);
    let rest = trimmed.strip_prefix(label)?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, PartialEq, Debug)]
    struct Probe {
        approved: bool,
    }

    #[test]
    fn parses_bare_json() {
        let probe: Probe = parse_json_lenient(r#"{"approved": true}"#).unwrap();
        assert!(probe.approved);
    }

    #[test]
    fn parses_fenced_json_with_commentary() {
        let response = "Here is my review:\n```json\n{\"approved\": false}\n```\nThanks!";
        let probe: Probe = parse_json_lenient(response).unwrap();
        assert!(!probe.approved);
    }

    #[test]
    fn missing_json_is_none() {
        assert!(parse_json_lenient::<Probe>("no json here").is_none());
    }

    #[test]
    fn extracts_multiple_code_blocks() {
        let response = "intro\n```python\nprint(1)\n```\ntext\n```\nlet x = 2;\n```\n";
        let blocks = extract_code_blocks(response);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], ("python".to_string(), "print(1)".to_string()));
        assert_eq!(blocks[1].0, "");
    }

    #[test]
    fn labeled_line_strips_bullets_and_colon() {
        assert_eq!(labeled_line("- Summary: good stuff", "Summary"), Some("good stuff"));
        assert_eq!(labeled_line("Estimated Length: 2000 words", "Estimated Length"), Some("2000 words"));
        assert_eq!(labeled_line("other", "Summary"), None);
    }
}

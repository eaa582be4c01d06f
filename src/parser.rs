//! Structured decoding of model output
//!
//! Models wrap JSON in markdown fences or chatty preambles. The parser strips
//! the fences, decodes, and as a last resort decodes the outermost
//! `{...}`/`[...]` slice. JSON that merely repeats the prompt is refused.
//! Failures are [`ParseError`]s, never transport errors.

use crate::ai::truncate;
use crate::error::ParseError;
use serde::de::DeserializeOwned;

const EXCERPT_CHARS: usize = 120;

/// Remove a leading fence line (```` ``` ```` or ```` ```json ````) and a
/// trailing fence, then trim.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // drop the info string (`json`, `JSON`, ...) up to the end of the line
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Outermost JSON object or array embedded in `text`.
fn embedded_json(text: &str) -> Option<&str> {
    let object = text.find('{').zip(text.rfind('}'));
    let array = text.find('[').zip(text.rfind(']'));

    let (start, end) = match (object, array) {
        (Some(o), Some(a)) => {
            if a.0 < o.0 {
                a
            } else {
                o
            }
        }
        (Some(o), None) => o,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    (start < end).then(|| &text[start..=end])
}

/// Decode model output into `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    decode(raw, None)
}

/// Decode the reply to `prompt` into `T`.
///
/// JSON copied verbatim out of the prompt (typically its output-format
/// example) is not an answer and is rejected, whether it is the whole reply
/// or embedded in it.
pub fn parse_reply<T: DeserializeOwned>(raw: &str, prompt: &str) -> Result<T, ParseError> {
    decode(raw, Some(prompt))
}

fn decode<T: DeserializeOwned>(raw: &str, prompt: Option<&str>) -> Result<T, ParseError> {
    let text = strip_code_fences(raw);
    let echoed = |candidate: &str| prompt.is_some_and(|p| p.contains(candidate));

    let first_error = match serde_json::from_str::<T>(text) {
        Ok(_) if echoed(text) => return Err(echo_error(text)),
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(slice) = embedded_json(text) {
        if slice.len() != text.len() {
            if let Ok(value) = serde_json::from_str::<T>(slice) {
                if echoed(slice) {
                    return Err(echo_error(text));
                }
                tracing::debug!("Recovered structured payload embedded in surrounding text");
                return Ok(value);
            }
        }
    }

    Err(ParseError {
        message: first_error.to_string(),
        excerpt: truncate(text, EXCERPT_CHARS),
    })
}

fn echo_error(text: &str) -> ParseError {
    ParseError {
        message: "reply only repeats JSON from the prompt".to_string(),
        excerpt: truncate(text, EXCERPT_CHARS),
    }
}

/// Untyped variant of [`parse_structured`].
pub fn parse_value(raw: &str) -> Result<serde_json::Value, ParseError> {
    parse_structured(raw)
}

//! Decoding generative endpoint answers
//!
//! An endpoint either returns the structured payload directly, or an LLM
//! envelope whose text content carries the payload as a JSON fragment
//! (often inside a fenced code block).

use crate::error::{HttpError, HttpResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Text content of an LLM envelope
///
/// Checks `message.content`, then `choices[0].message.content`, then
/// `response`.
#[must_use]
pub fn extract_llm_content(value: &Value) -> Option<String> {
    if let Some(content) = value.pointer("/message/content").and_then(Value::as_str) {
        return Some(content.to_string());
    }
    if let Some(content) = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return Some(content.to_string());
    }
    value
        .get("response")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Outermost `{...}` or `[...]` span of `text`
#[must_use]
pub fn extract_json_fragment(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let sliced = &text[start..];
    let end = sliced.rfind(['}', ']'])?;
    Some(&sliced[..=end])
}

/// Decode `T` from a direct payload or from an envelope
///
/// # Errors
/// `HttpError::Malformed` when neither shape yields a `T`
pub fn decode_payload<T: DeserializeOwned>(value: Value) -> HttpResult<T> {
    let Some(content) = extract_llm_content(&value) else {
        return serde_json::from_value(value).map_err(|e| HttpError::malformed(e.to_string()));
    };
    let fragment = extract_json_fragment(&content)
        .ok_or_else(|| HttpError::malformed("envelope content has no JSON fragment"))?;
    serde_json::from_str(fragment).map_err(|e| HttpError::malformed(e.to_string()))
}

/// Plain text from a direct string, a `text`/`elements` field or an envelope
///
/// # Errors
/// `HttpError::Malformed` when no text is found
pub fn decode_text(value: &Value) -> HttpResult<String> {
    if let Some(text) = value.as_str() {
        return Ok(text.to_string());
    }
    for key in ["text", "elements"] {
        if let Some(text) = value.get(key).and_then(Value::as_str) {
            return Ok(text.to_string());
        }
    }
    if let Some(content) = extract_llm_content(value) {
        // the content may itself be a JSON object with a text field
        if let Some(inner) = extract_json_fragment(&content)
            .and_then(|fragment| serde_json::from_str::<Value>(fragment).ok())
            .filter(Value::is_object)
        {
            if let Ok(text) = decode_text(&inner) {
                return Ok(text);
            }
        }
        return Ok(content);
    }
    Err(HttpError::malformed("response has no text"))
}

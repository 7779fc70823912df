//! Fallback resolver over HTTP

use crate::client::{EndpointConfig, JsonEndpoint};
use crate::envelope::decode_payload;
use crate::error::HttpResult;
use async_trait::async_trait;
use lookup_engine::{FallbackResolver, RawResolverOutput, ResolverError};
use serde_json::{json, Map, Value};

/// Resolver POSTing `{"query": ...}`
///
/// The answer is a flat JSON object (directly or inside an LLM envelope).
/// The identifier is read from `identifier_field` (`code` by default, as in
/// `{"code": "F.S. § 812.014", "title": "Theft", ...}`), falling back to an
/// `identifier` key; every other string field is carried as free text.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    endpoint: JsonEndpoint,
    identifier_field: String,
}

impl HttpResolver {
    /// Create resolver for `config`
    ///
    /// # Errors
    /// Invalid endpoint configuration
    pub fn new(config: &EndpointConfig) -> HttpResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(config)?,
            identifier_field: "code".to_string(),
        })
    }

    /// With the answer field holding the identifier
    #[must_use]
    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }
}

/// Interpret a decoded answer object
///
/// # Errors
/// `HttpError::Malformed` when the answer is not a JSON object
pub fn parse_answer(value: Value, identifier_field: &str) -> HttpResult<RawResolverOutput> {
    let object: Map<String, Value> = decode_payload(value)?;

    let identifier = object
        .get(identifier_field)
        .or_else(|| object.get("identifier"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut output = RawResolverOutput::new(identifier);
    for (name, value) in object {
        if name == identifier_field || name == "identifier" {
            continue;
        }
        match value {
            Value::String(text) => output.fields.insert(name, text),
            Value::Number(n) => output.fields.insert(name, n.to_string()),
            Value::Bool(b) => output.fields.insert(name, b.to_string()),
            _ => None,
        };
    }
    Ok(output)
}

#[async_trait]
impl FallbackResolver for HttpResolver {
    async fn resolve(&self, query: &str) -> Result<RawResolverOutput, ResolverError> {
        let body = json!({ "query": query });
        let Some(value) = self.endpoint.post(&body).await? else {
            return Ok(RawResolverOutput::not_found());
        };
        parse_answer(value, &self.identifier_field).map_err(ResolverError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;

    #[test]
    fn statute_answer_uses_code_as_identifier() {
        let value = json!({
            "code": "F.S. § 812.014",
            "title": "Theft",
            "description": "Taking property of another",
            "degreeOfCharge": "Varies (by value)"
        });
        let output = parse_answer(value, "code").unwrap();
        assert_eq!(output.identifier, "F.S. § 812.014");
        assert_eq!(output.fields.get("title").map(String::as_str), Some("Theft"));
        assert!(!output.fields.contains_key("code"));
    }

    #[test]
    fn enveloped_sentinel_answer() {
        let value = json!({"response": "```json\n{\"code\": \"N/A\", \"title\": \"N/A\"}\n```"});
        let output = parse_answer(value, "code").unwrap();
        assert_eq!(output.identifier, "N/A");
    }

    #[test]
    fn identifier_key_fallback() {
        let value = json!({"identifier": "Sec. 10-2", "title": "Noise"});
        let output = parse_answer(value, "number").unwrap();
        assert_eq!(output.identifier, "Sec. 10-2");
    }

    #[test]
    fn missing_identifier_is_empty() {
        let output = parse_answer(json!({"title": "Theft"}), "code").unwrap();
        assert!(output.identifier.is_empty());
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            parse_answer(json!(["a", "b"]), "code"),
            Err(HttpError::Malformed(_))
        ));
    }
}

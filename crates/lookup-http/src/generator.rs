//! Derived-field generator over HTTP

use crate::client::{EndpointConfig, JsonEndpoint};
use crate::envelope::decode_text;
use crate::error::HttpResult;
use async_trait::async_trait;
use lookup_engine::{DerivedFieldGenerator, GenerationError};
use lookup_index::ItemId;
use serde_json::json;
use std::collections::HashMap;

/// Derived-field generator POSTing `{"id": ..., "context": {...}}`
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    endpoint: JsonEndpoint,
}

impl HttpGenerator {
    /// Create generator for `config`
    ///
    /// # Errors
    /// Invalid endpoint configuration
    pub fn new(config: &EndpointConfig) -> HttpResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(config)?,
        })
    }
}

#[async_trait]
impl DerivedFieldGenerator for HttpGenerator {
    async fn generate(
        &self,
        id: &ItemId,
        context: HashMap<String, String>,
    ) -> Result<String, GenerationError> {
        let body = json!({ "id": id, "context": context });
        let value = self
            .endpoint
            .post(&body)
            .await?
            .ok_or_else(|| GenerationError::failed("generator endpoint not found"))?;
        Ok(decode_text(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EndpointConfig;

    #[test]
    fn builds_for_valid_endpoint() {
        let generator = HttpGenerator::new(&EndpointConfig::new("http://localhost:9000/elements"));
        assert!(generator.is_ok());
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let generator = HttpGenerator::new(&EndpointConfig::new("not a url"));
        assert!(matches!(generator, Err(crate::HttpError::InvalidEndpoint(_))));
    }
}

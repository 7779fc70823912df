//! Detail provider over HTTP

use crate::client::{EndpointConfig, JsonEndpoint};
use crate::envelope::decode_payload;
use crate::error::HttpResult;
use async_trait::async_trait;
use lookup_engine::{DetailError, DetailProvider, FullRecord};
use lookup_index::ItemId;
use serde_json::{json, Value};

/// Detail provider POSTing `{"id": ...}`
///
/// A 404 or a JSON `null` answer means "no record".
#[derive(Debug, Clone)]
pub struct HttpDetailProvider {
    endpoint: JsonEndpoint,
}

impl HttpDetailProvider {
    /// Create provider for `config`
    ///
    /// # Errors
    /// Invalid endpoint configuration
    pub fn new(config: &EndpointConfig) -> HttpResult<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(config)?,
        })
    }
}

/// Interpret a detail answer
///
/// # Errors
/// `HttpError::Malformed` when the answer is neither null nor a record
pub fn parse_record(value: Value) -> HttpResult<Option<FullRecord>> {
    if value.is_null() {
        return Ok(None);
    }
    decode_payload(value).map(Some)
}

#[async_trait]
impl DetailProvider for HttpDetailProvider {
    async fn fetch(&self, id: &ItemId) -> Result<Option<FullRecord>, DetailError> {
        let body = json!({ "id": id });
        let Some(value) = self.endpoint.post(&body).await? else {
            return Ok(None);
        };
        Ok(parse_record(value)?)
    }
}

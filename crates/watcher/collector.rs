use crate::models::ItemRecord;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inventory endpoint returned non-success status: {0}")]
    Status(StatusCode),
    #[error("inventory response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected inventory response shape: {0}")]
    UnexpectedShape(String),
}

/// Anything able to produce one inventory snapshot per call.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ItemRecord>, FetchError>;
}

/// Fetches inventory snapshots from a fixed HTTP endpoint.
#[derive(Debug, Clone)]
pub struct InventoryCollector {
    client: Client,
    endpoint: Url,
    identifier_key: String,
}

impl InventoryCollector {
    pub fn new(endpoint: Url, identifier_key: String, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            endpoint,
            identifier_key,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl SnapshotSource for InventoryCollector {
    async fn fetch(&self) -> Result<Vec<ItemRecord>, FetchError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "inventory response received");
        let value: Value = serde_json::from_slice(&body)?;
        parse_snapshot(value, &self.identifier_key)
    }
}

/// Turns a decoded response body into item records.
///
/// The body must be an array of objects. Objects without a usable identifier
/// are dropped with a warning instead of failing the whole snapshot.
pub fn parse_snapshot(body: Value, identifier_key: &str) -> Result<Vec<ItemRecord>, FetchError> {
    let Value::Array(entries) = body else {
        return Err(FetchError::UnexpectedShape(format!(
            "expected a json array, got {}",
            kind_of(&body)
        )));
    };

    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(attributes) = entry else {
            return Err(FetchError::UnexpectedShape(format!(
                "element {index} is {}, expected an object",
                kind_of(&entry)
            )));
        };
        match ItemRecord::from_object(attributes, identifier_key) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            skipped,
            identifier_key, "skipped inventory entries without a usable identifier"
        );
    }

    Ok(items)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

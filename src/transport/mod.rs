use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::source::Source;

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig};

/// A successfully retrieved body plus the response metadata the policy may look at.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self { Self { bytes: bytes.into(), content_type: None } }

    pub fn len(&self) -> u64 { self.bytes.len() as u64 }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("not found (HTTP 404)")]
    NotFound,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
}

/// Retrieves the payload behind a source. One call is one attempt; retrying is
/// the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn retrieve(&self, source: &Source, timeout: Duration) -> Result<Payload, TransportError>;
}


use crate::core::error::TransportError;
use crate::core::model::RequestDescriptor;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Response headers plus the raw, not yet consumed body.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
    }

    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Issues a single GET. Implementations should stop promptly once `cancel` fires;
/// the engine also drops the pending future when it observes cancellation.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(
        &self,
        req: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

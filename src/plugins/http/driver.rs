use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::error::TransportError;
use crate::core::model::RequestDescriptor;
use crate::core::transport::{Transport, TransportResponse};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("progress-fetch/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// reqwest-backed transport. One client is shared by every operation of an engine.
pub struct HttpDriver {
    client: reqwest::Client,
    cfg: ClientConfig,
}

impl HttpDriver {
    pub fn new(cfg: ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(cfg.max_redirects))
            .connect_timeout(cfg.connect_timeout)
            .build()?;
        Ok(Self { client, cfg })
    }

    fn build_headers(&self, req: &RequestDescriptor) -> Result<HeaderMap, TransportError> {
        let mut h = HeaderMap::new();
        let ua = HeaderValue::from_str(&self.cfg.user_agent)
            .map_err(|_| TransportError::InvalidHeader(format!("user-agent: {}", self.cfg.user_agent)))?;
        h.insert(USER_AGENT, ua);
        for (k, v) in &req.options.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(k.clone()))?;
            let value = HeaderValue::from_str(v)
                .map_err(|_| TransportError::InvalidHeader(format!("{k}: {v}")))?;
            h.insert(name, value);
        }
        Ok(h)
    }
}

#[async_trait]
impl Transport for HttpDriver {
    fn name(&self) -> &'static str {
        "http-driver"
    }

    async fn get(
        &self,
        req: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let headers = self.build_headers(req)?;

        let mut builder = self.client.get(req.url.clone()).headers(headers);
        if let Some(t) = req.options.timeout {
            builder = builder.timeout(t);
        }

        // 取消时直接丢弃请求 future，reqwest 会关闭连接
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Aborted),
            r = builder.send() => r?,
        };

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes_stream().map_err(TransportError::from);

        Ok(TransportResponse { status, headers, body: Box::pin(body) })
    }
}

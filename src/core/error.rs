use reqwest::StatusCode;
use std::string::FromUtf8Error;

/// Failures raised by a [`Transport`](crate::core::transport::Transport) while issuing the
/// request or reading the body.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request error: {}: {}", .0.as_u16(), .0.canonical_reason().unwrap_or("unknown status"))]
    Status(StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    /// 传输层在取消后返回的错误（引擎会将其归类为 Aborted）
    #[error("transfer aborted")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("content-length is unknown: the server sent no Content-Length header and no byte length override was supplied")]
    MissingContentLength,

    #[error(
        "read error: no body reader matches content type {}; supply an explicit parse mode or body reader",
        .0.as_deref().unwrap_or("<none>")
    )]
    UnmatchedContentType(Option<String>),
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("invalid form body: {0}")]
    Form(String),

    #[error("body reader failed: {0}")]
    Reader(String),
}

/// Error carried by a `Failed` outcome.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("fetch task panicked")]
    Panicked,
}

impl FetchError {
    pub fn is_config(&self) -> bool {
        matches!(self, FetchError::Config(_))
    }
}

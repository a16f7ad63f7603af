use crate::core::parse::{BodyReader, ParseMode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub type OperationId = Uuid;

/// Per-request options supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    /// Fail with `MissingContentLength` instead of reporting progress with an unknown total.
    pub require_content_length: bool,
}

/// Explicit body reader chosen by the caller; always wins over content-type sniffing.
#[derive(Clone)]
pub enum Reader {
    Builtin(ParseMode),
    Custom(Arc<dyn BodyReader>),
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reader::Builtin(mode) => f.debug_tuple("Builtin").field(mode).finish(),
            Reader::Custom(r) => f.debug_tuple("Custom").field(&r.name()).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub options: FetchOptions,
    /// Overrides the response's Content-Length as the progress denominator.
    pub content_length: Option<u64>,
    pub reader: Option<Reader>,
}

impl RequestDescriptor {
    pub fn new(url: Url) -> Self {
        Self { url, options: FetchOptions::default(), content_length: None, reader: None }
    }

    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(raw)?))
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    pub fn parse_as(mut self, mode: ParseMode) -> Self {
        self.reader = Some(Reader::Builtin(mode));
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn BodyReader>) -> Self {
        self.reader = Some(Reader::Custom(reader));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// `None` when the total size is unknown.
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(100.0),
            Some(t) => Some((self.loaded as f64 / t as f64) * 100.0),
            None => None,
        }
    }
}

/// Operation state machine. Terminal states are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Streaming,
    Parsing,
    Completed,
    Aborted,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted | Phase::Failed)
    }

    pub fn can_advance(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Idle, Requesting) => true,
            (Requesting, Streaming) => true,
            (Streaming, Parsing) => true,
            (Parsing, Completed) => true,
            (Idle | Requesting | Streaming | Parsing, Failed | Aborted) => true,
            _ => false,
        }
    }
}

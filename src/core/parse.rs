//! Body parser selection: explicit reader, else content-type sniffing, else a configuration error.

use crate::core::error::{ConfigError, FetchError, ParseError};
use crate::core::model::Reader;
use async_trait::async_trait;
use bytes::Bytes;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

/// The fully drained response body handed to a reader.
#[derive(Debug, Clone)]
pub struct Body {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Json,
    Text,
    Bytes,
    Form,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "bytes" | "blob" | "arraybuffer" => Ok(Self::Bytes),
            "form" | "formdata" => Ok(Self::Form),
            other => Err(format!("unknown parse mode: {other} (expected json, text, bytes or form)")),
        }
    }
}

/// Caller-supplied body reader.
#[async_trait]
pub trait BodyReader: Send + Sync {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn read(&self, body: Body) -> anyhow::Result<ParsedBody>;
}

/// Picks the reader for a response. The explicit reader always wins.
pub fn select_reader(explicit: Option<&Reader>, content_type: Option<&str>) -> Result<Reader, ConfigError> {
    if let Some(r) = explicit {
        return Ok(r.clone());
    }

    sniff(content_type)
        .map(Reader::Builtin)
        .ok_or_else(|| ConfigError::UnmatchedContentType(content_type.map(str::to_string)))
}

fn sniff(content_type: Option<&str>) -> Option<ParseMode> {
    let ct = content_type?.to_ascii_lowercase();
    if ct.contains("json") {
        Some(ParseMode::Json)
    } else if ct.contains("x-www-form-urlencoded") || ct.contains("multipart/form-data") {
        Some(ParseMode::Form)
    } else if ct.contains("text") || ct.contains("xml") || ct.contains("javascript") {
        Some(ParseMode::Text)
    } else {
        None
    }
}

/// Runs exactly one parse attempt.
pub async fn read_body(reader: &Reader, body: Body) -> Result<ParsedBody, FetchError> {
    match reader {
        Reader::Builtin(ParseMode::Form) => Ok(parse_form(body).await?),
        Reader::Builtin(mode) => Ok(parse_builtin(*mode, body.bytes)?),
        Reader::Custom(r) => read_custom(r, body).await,
    }
}

async fn read_custom(reader: &Arc<dyn BodyReader>, body: Body) -> Result<ParsedBody, FetchError> {
    reader
        .read(body)
        .await
        .map_err(|e| ParseError::Reader(format!("{}: {:#}", reader.name(), e)).into())
}

fn parse_builtin(mode: ParseMode, bytes: Bytes) -> Result<ParsedBody, ParseError> {
    match mode {
        ParseMode::Json => Ok(ParsedBody::Json(serde_json::from_slice(&bytes)?)),
        ParseMode::Text => Ok(ParsedBody::Text(String::from_utf8(bytes.to_vec())?)),
        ParseMode::Bytes => Ok(ParsedBody::Bytes(bytes)),
        ParseMode::Form => parse_urlencoded(&bytes),
    }
}

/// Form bodies are either `multipart/form-data` (boundary taken from the content type) or
/// urlencoded. Every multipart field must be named and valid UTF-8.
async fn parse_form(body: Body) -> Result<ParsedBody, ParseError> {
    let is_multipart = body
        .content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);
    if !is_multipart {
        return parse_urlencoded(&body.bytes);
    }

    let ct = body.content_type.unwrap_or_default();
    let boundary = multer::parse_boundary(&ct).map_err(|e| ParseError::Form(format!("{ct}: {e}")))?;
    let chunk = futures::stream::once(futures::future::ready(Ok::<Bytes, Infallible>(body.bytes)));
    let mut multipart = multer::Multipart::new(chunk, boundary);

    let mut pairs = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| ParseError::Form(e.to_string()))? {
        let name = field
            .name()
            .map(str::to_string)
            .ok_or_else(|| ParseError::Form("multipart field without a name".to_string()))?;
        let data = field.bytes().await.map_err(|e| ParseError::Form(e.to_string()))?;
        let value = String::from_utf8(data.to_vec())
            .map_err(|_| ParseError::Form(format!("field {name} is not valid utf-8")))?;
        pairs.push((name, value));
    }
    Ok(ParsedBody::Form(pairs))
}

fn parse_urlencoded(bytes: &[u8]) -> Result<ParsedBody, ParseError> {
    if std::str::from_utf8(bytes).is_err() {
        return Err(ParseError::Form("body is not valid utf-8".to_string()));
    }
    let pairs = url::form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok(ParsedBody::Form(pairs))
}

//! Single HTTP retrieval with byte-level progress, cooperative cancellation and a pluggable
//! body reader.
//!
//! - [`core::engine::Engine`] starts operations and hands out [`core::engine::FetchHandle`]s.
//! - [`core::session::FetchSession`] keeps one current operation and its latest result.
//! - [`plugins::http::driver::HttpDriver`] is the reqwest-backed transport.

pub mod core;
pub mod i18n;
pub mod logging;
pub mod plugins;

pub use crate::core::engine::{Engine, FetchHandle};
pub use crate::core::error::{ConfigError, FetchError, ParseError, TransportError};
pub use crate::core::events::{FetchEvent, FetchObserver, NoopObserver, Outcome};
pub use crate::core::model::{FetchOptions, OperationId, Phase, ProgressEvent, Reader, RequestDescriptor};
pub use crate::core::parse::{Body, BodyReader, ParseMode, ParsedBody};
pub use crate::core::session::FetchSession;
pub use crate::core::transport::{Transport, TransportResponse};

pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod parse;
pub mod progress;
pub mod session;
pub mod transport;

pub use tokio_util::sync::CancellationToken;

//! Pass-through body stream that counts bytes and reports progress per chunk.

use crate::core::error::TransportError;
use crate::core::model::ProgressEvent;
use crate::core::transport::ByteStream;
use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Wraps a response body. Chunks are forwarded unchanged; after each non-empty chunk the
/// callback receives the running `loaded` count and the expected total (`None` if unknown).
///
/// Empty chunks are forwarded but do not produce a progress event, since `loaded` would not move.
///
/// Once the token is cancelled the stream yields a single `TransportError::Aborted` and ends,
/// without forwarding any further chunk.
pub struct ProgressStream<F> {
    inner: ByteStream,
    loaded: u64,
    total: Option<u64>,
    on_progress: F,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl<F> ProgressStream<F>
where
    F: FnMut(ProgressEvent) + Unpin,
{
    pub fn new(inner: ByteStream, total: Option<u64>, cancel: &CancellationToken, on_progress: F) -> Self {
        Self {
            inner,
            loaded: 0,
            total,
            on_progress,
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
            done: false,
        }
    }

    pub fn loaded(&self) -> u64 {
        self.loaded
    }
}

impl<F> Stream for ProgressStream<F>
where
    F: FnMut(ProgressEvent) + Unpin,
{
    type Item = Result<Bytes, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.done = true;
            return Poll::Ready(Some(Err(TransportError::Aborted)));
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    this.loaded += chunk.len() as u64;
                    tracing::trace!(loaded = this.loaded, total = ?this.total, "chunk received");
                    (this.on_progress)(ProgressEvent { loaded: this.loaded, total: this.total });
                }
                Poll::Ready(Some(Ok(chunk)))
            }
        }
    }
}

use crate::core::error::{ConfigError, FetchError, TransportError};
use crate::core::events::{FetchObserver, Outcome};
use crate::core::model::{OperationId, Phase, ProgressEvent, RequestDescriptor};
use crate::core::parse::{read_body, select_reader, Body};
use crate::core::progress::ProgressStream;
use crate::core::transport::Transport;
use bytes::BytesMut;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Upper bound for pre-allocating the body buffer from a declared length.
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

/// Starts fetch operations on a shared transport. Each operation runs on its own task with its
/// own cancellation token and reports to its own observer.
#[derive(Clone)]
pub struct Engine {
    transport: Arc<dyn Transport>,
}

impl Engine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Spawns the operation onto the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(&self, req: RequestDescriptor, observer: Arc<dyn FetchObserver>) -> FetchHandle {
        let op = Arc::new(Operation {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
            phase: Mutex::new(Phase::Idle),
            observer,
        });

        let transport = self.transport.clone();
        let task_op = op.clone();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(task_op.run(transport.as_ref(), req))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(id = %task_op.id, "fetch task panicked");
                    Outcome::Failed(FetchError::Panicked)
                });
            task_op.settle(outcome)
        });

        FetchHandle { op, task }
    }
}

/// Handle to a started operation. Dropping it detaches the operation without cancelling it.
pub struct FetchHandle {
    op: Arc<Operation>,
    task: JoinHandle<Outcome>,
}

impl FetchHandle {
    pub fn id(&self) -> OperationId {
        self.op.id
    }

    /// Requests cooperative cancellation. Idempotent.
    ///
    /// On a terminal operation this still trips the token, so [`is_cancelled`](Self::is_cancelled)
    /// reports `true`, but the phase, the outcome and the notifications already fired stay as they were.
    pub fn cancel(&self) {
        if !self.op.token.is_cancelled() {
            tracing::debug!(id = %self.op.id, "cancel requested");
            self.op.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.op.token.is_cancelled()
    }

    pub fn phase(&self) -> Phase {
        *self.op.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(id = %self.op.id, "fetch task failed: {}", e);
                Outcome::Failed(FetchError::Panicked)
            }
        }
    }
}

struct Operation {
    id: OperationId,
    token: CancellationToken,
    phase: Mutex<Phase>,
    observer: Arc<dyn FetchObserver>,
}

impl Operation {
    async fn run(&self, transport: &dyn Transport, req: RequestDescriptor) -> Outcome {
        self.advance(Phase::Requesting);
        tracing::debug!(id = %self.id, url = %req.url, transport = transport.name(), "requesting");

        let response = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Outcome::Aborted,
            r = transport.get(&req, &self.token) => r,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => return Outcome::Failed(e.into()),
        };

        if !response.status.is_success() {
            return Outcome::Failed(TransportError::Status(response.status).into());
        }

        let total = req.content_length.or_else(|| response.content_length());
        if total.is_none() {
            if req.options.require_content_length {
                return Outcome::Failed(ConfigError::MissingContentLength.into());
            }
            tracing::warn!(id = %self.id, "Content-Length header is absent; progress is reported without a total");
        }

        let content_type = response.content_type();
        let reader = match select_reader(req.reader.as_ref(), content_type.as_deref()) {
            Ok(r) => r,
            Err(e) => return Outcome::Failed(e.into()),
        };

        self.advance(Phase::Streaming);
        tracing::debug!(id = %self.id, status = %response.status, total = ?total, content_type = ?content_type, "streaming");

        let capacity = total.unwrap_or(0).min(MAX_PREALLOC) as usize;
        let mut buf = BytesMut::with_capacity(capacity);
        let mut stream = ProgressStream::new(response.body, total, &self.token, |p| self.emit_progress(p));
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(e) => return Outcome::Failed(e.into()),
            }
        }

        self.advance(Phase::Parsing);
        tracing::debug!(id = %self.id, bytes = buf.len(), reader = ?reader, "parsing");

        let body = Body { bytes: buf.freeze(), content_type };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Outcome::Aborted,
            r = read_body(&reader, body) => match r {
                Ok(parsed) => Outcome::Completed(parsed),
                Err(e) => Outcome::Failed(e),
            },
        }
    }

    fn advance(&self, next: Phase) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if phase.can_advance(next) {
            *phase = next;
            true
        } else {
            tracing::warn!(id = %self.id, from = ?*phase, to = ?next, "illegal phase transition ignored");
            false
        }
    }

    fn emit_progress(&self, progress: ProgressEvent) {
        if self.token.is_cancelled() {
            return;
        }
        self.observer.on_progress(self.id, progress);
    }

    /// Moves to a terminal phase and fires the single terminal notification.
    /// Any outcome reached after cancellation was requested is reported as `Aborted`.
    fn settle(&self, outcome: Outcome) -> Outcome {
        let outcome = match outcome {
            Outcome::Completed(_) | Outcome::Failed(_) if self.token.is_cancelled() => Outcome::Aborted,
            o => o,
        };
        let next = match &outcome {
            Outcome::Completed(_) => Phase::Completed,
            Outcome::Aborted => Phase::Aborted,
            Outcome::Failed(_) => Phase::Failed,
        };
        if !self.advance(next) {
            return outcome;
        }

        match &outcome {
            Outcome::Completed(body) => {
                tracing::debug!(id = %self.id, "fetch completed");
                self.observer.on_finish(self.id, body);
            }
            Outcome::Aborted => {
                tracing::warn!(id = %self.id, "fetch operation was aborted");
                self.observer.on_aborted(self.id);
            }
            Outcome::Failed(e) => {
                tracing::error!(id = %self.id, "fetch failed: {}", e);
                self.observer.on_error(self.id, e);
            }
        }
        outcome
    }
}

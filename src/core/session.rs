//! Holds the "current" operation for a consumer and the latest parsed result.
//!
//! Starting a new operation supersedes the current one: its token is cancelled before the new
//! operation is installed. Late progress and finish notifications from a superseded operation are
//! dropped, and only the current operation may set the latest result.

use crate::core::engine::{Engine, FetchHandle};
use crate::core::error::FetchError;
use crate::core::events::FetchObserver;
use crate::core::model::{OperationId, Phase, ProgressEvent, RequestDescriptor};
use crate::core::parse::ParsedBody;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Default)]
struct SessionState {
    current: Option<FetchHandle>,
    data: Option<ParsedBody>,
}

impl SessionState {
    fn is_current(&self, id: OperationId) -> bool {
        self.current.as_ref().map(FetchHandle::id) == Some(id)
    }
}

pub struct FetchSession {
    engine: Engine,
    state: Arc<Mutex<SessionState>>,
}

impl FetchSession {
    pub fn new(engine: Engine) -> Self {
        Self { engine, state: Arc::new(Mutex::new(SessionState::default())) }
    }

    /// Cancels the current operation, if any, then starts `req` as the new current one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like [`Engine::start`].
    pub fn start(&self, req: RequestDescriptor, observer: Arc<dyn FetchObserver>) -> OperationId {
        let mut state = self.lock();
        if let Some(old) = state.current.take() {
            if !old.phase().is_terminal() {
                tracing::debug!(id = %old.id(), "superseding in-flight operation");
            }
            old.cancel();
        }

        let relay = Arc::new(SessionRelay { state: Arc::downgrade(&self.state), inner: observer });
        let handle = self.engine.start(req, relay);
        let id = handle.id();
        state.current = Some(handle);
        id
    }

    /// Cancels the current operation. No-op when nothing is running.
    pub fn abort(&self) {
        if let Some(h) = self.lock().current.as_ref() {
            h.cancel();
        }
    }

    /// Result of the latest operation that finished while current; `None` before that.
    pub fn data(&self) -> Option<ParsedBody> {
        self.lock().data.clone()
    }

    pub fn current_id(&self) -> Option<OperationId> {
        self.lock().current.as_ref().map(FetchHandle::id)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.lock().current.as_ref().map(FetchHandle::phase)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FetchSession {
    fn drop(&mut self) {
        self.abort();
    }
}

struct SessionRelay {
    state: Weak<Mutex<SessionState>>,
    inner: Arc<dyn FetchObserver>,
}

impl SessionRelay {
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let state = self.state.upgrade()?;
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut guard))
    }
}

impl FetchObserver for SessionRelay {
    fn on_progress(&self, id: OperationId, progress: ProgressEvent) {
        if self.with_state(|s| s.is_current(id)) == Some(true) {
            self.inner.on_progress(id, progress);
        }
    }

    fn on_finish(&self, id: OperationId, body: &ParsedBody) {
        let current = self.with_state(|s| {
            let current = s.is_current(id);
            if current {
                s.data = Some(body.clone());
            }
            current
        });
        if current == Some(true) {
            self.inner.on_finish(id, body);
        } else {
            tracing::debug!(id = %id, "dropping result of superseded operation");
        }
    }

    fn on_aborted(&self, id: OperationId) {
        self.inner.on_aborted(id);
    }

    fn on_error(&self, id: OperationId, error: &FetchError) {
        self.inner.on_error(id, error);
    }
}

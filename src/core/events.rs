use crate::core::error::FetchError;
use crate::core::model::{OperationId, ProgressEvent};
use crate::core::parse::ParsedBody;
use tokio::sync::mpsc;

/// Terminal result of one operation.
#[derive(Debug)]
pub enum Outcome {
    Completed(ParsedBody),
    Aborted,
    Failed(FetchError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    Progress { id: OperationId, progress: ProgressEvent },
    Finished { id: OperationId, body: ParsedBody },
    Aborted { id: OperationId },
    Failed { id: OperationId, message: String },
}

impl FetchEvent {
    pub fn id(&self) -> OperationId {
        match self {
            FetchEvent::Progress { id, .. }
            | FetchEvent::Finished { id, .. }
            | FetchEvent::Aborted { id }
            | FetchEvent::Failed { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchEvent::Progress { .. })
    }
}

/// Notification contract of an operation: zero or more `on_progress`, then exactly one of
/// `on_finish`, `on_aborted` or `on_error`.
pub trait FetchObserver: Send + Sync {
    fn on_progress(&self, _id: OperationId, _progress: ProgressEvent) {}

    fn on_finish(&self, _id: OperationId, _body: &ParsedBody) {}

    fn on_aborted(&self, _id: OperationId) {}

    fn on_error(&self, _id: OperationId, _error: &FetchError) {}
}

pub struct NoopObserver;

impl FetchObserver for NoopObserver {}

impl FetchObserver for mpsc::UnboundedSender<FetchEvent> {
    fn on_progress(&self, id: OperationId, progress: ProgressEvent) {
        let _ = self.send(FetchEvent::Progress { id, progress });
    }

    fn on_finish(&self, id: OperationId, body: &ParsedBody) {
        let _ = self.send(FetchEvent::Finished { id, body: body.clone() });
    }

    fn on_aborted(&self, id: OperationId) {
        let _ = self.send(FetchEvent::Aborted { id });
    }

    fn on_error(&self, id: OperationId, error: &FetchError) {
        let _ = self.send(FetchEvent::Failed { id, message: error.to_string() });
    }
}

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::ExecError;

/// FIFO of lines waiting to be written to a process's standard input.
///
/// Any number of producers may [`enqueue`](CommandQueue::enqueue); a single
/// consumer drains it with [`dequeue`](CommandQueue::dequeue).
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: Mutex<VecDeque<String>>,
    ready: Notify,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. Lines must not contain line breaks; the newline is added on delivery.
    pub fn enqueue(&self, line: impl Into<String>) -> Result<(), ExecError> {
        let line = line.into();
        if line.contains(['\n', '\r']) {
            return Err(ExecError::InvalidArgument(
                "command must be a single line".into(),
            ));
        }

        let depth = {
            let mut items = self.items();
            items.push_back(line);
            items.len()
        };
        trace!(depth, "command enqueued");
        self.ready.notify_one();
        Ok(())
    }

    /// Next line in FIFO order, waiting while the queue is empty.
    ///
    /// Returns `None` if `cancel` fires while nothing is queued.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<String> {
        loop {
            if let Some(line) = self.items().pop_front() {
                return Some(line);
            }
            tokio::select! {
                _ = self.ready.notified() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        self.items().clear();
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

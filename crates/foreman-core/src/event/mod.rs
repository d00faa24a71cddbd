//! Outbound event stream of the boss.
//!
//! Registry changes and runner state transitions are published on a broadcast
//! channel; the control plane and the log subscriber drain it at their own pace.
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use foreman_model::{LaborerName, RunnerState, WorkOutcome};

/// Default capacity of the broadcast buffer.
pub const EVENT_CAPACITY: usize = 1024;

/// Registry-level change applied to a laborer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkChange {
    Registered,
    Started,
    Stopped,
    Paused,
    Resumed,
    Removed,
}

impl WorkChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkChange::Registered => "registered",
            WorkChange::Started => "started",
            WorkChange::Stopped => "stopped",
            WorkChange::Paused => "paused",
            WorkChange::Resumed => "resumed",
            WorkChange::Removed => "removed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WorkEvent {
    /// A boss operation changed a laborer.
    Changed { name: LaborerName, change: WorkChange },
    /// A runner moved to a new state.
    StateChanged { name: LaborerName, state: RunnerState },
    /// A run finished with an exit code.
    Exited { name: LaborerName, outcome: WorkOutcome },
    /// A run failed with an error other than cancellation.
    Faulted { name: LaborerName, reason: String },
}

impl WorkEvent {
    pub fn name(&self) -> &str {
        match self {
            WorkEvent::Changed { name, .. }
            | WorkEvent::StateChanged { name, .. }
            | WorkEvent::Exited { name, .. }
            | WorkEvent::Faulted { name, .. } => name,
        }
    }
}

/// Cloneable publisher side of the work event stream.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<WorkEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event; having no subscribers is not an error.
    pub fn publish(&self, event: WorkEvent) {
        if self.tx.send(event).is_err() {
            trace!("work event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(WorkEvent::Faulted {
            name: "w1".into(),
            reason: "boom".into(),
        });
    }

    #[test]
    fn subscribers_see_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(WorkEvent::Changed {
            name: "w1".into(),
            change: WorkChange::Registered,
        });
        bus.publish(WorkEvent::Changed {
            name: "w1".into(),
            change: WorkChange::Started,
        });

        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkEvent::Changed { change: WorkChange::Registered, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkEvent::Changed { change: WorkChange::Started, .. }
        ));
    }

    #[test]
    fn serializes_with_event_tag() {
        let ev = WorkEvent::StateChanged {
            name: "w1".into(),
            state: RunnerState::Terminating,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "stateChanged");
        assert_eq!(json["state"], "terminating");
    }
}

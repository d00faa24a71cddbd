//! Work event logging.
//!
//! Drains the boss's event stream and logs each event with structured fields
//! at a level matching its severity.
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, trace, warn};

use foreman_core::{WorkChange, WorkEvent};
use foreman_model::RunnerState;

/// Log every event received on `rx` until the stream closes.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<WorkEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        trace!("event logger stopped");
    })
}

fn log_event(e: &WorkEvent) {
    let msg = message_for(e);

    match e {
        WorkEvent::Changed { name, change } => match change {
            WorkChange::Registered => debug!(laborer = %name, "{msg}"),
            _ => info!(laborer = %name, change = change.as_str(), "{msg}"),
        },
        WorkEvent::StateChanged { name, state } => match state {
            RunnerState::Terminating | RunnerState::Paused => {
                debug!(laborer = %name, state = %state, "{msg}")
            }
            _ => trace!(laborer = %name, state = %state, "{msg}"),
        },
        WorkEvent::Exited { name, outcome } if outcome.is_success() => info!(
            laborer = %name,
            exit_code = outcome.exit_code,
            message = %outcome.message,
            "{msg}"
        ),
        WorkEvent::Exited { name, outcome } => warn!(
            laborer = %name,
            exit_code = outcome.exit_code,
            message = %outcome.message,
            "{msg}"
        ),
        WorkEvent::Faulted { name, reason } => error!(laborer = %name, reason = %reason, "{msg}"),
    }
}

fn message_for(e: &WorkEvent) -> &'static str {
    match e {
        WorkEvent::Changed { change, .. } => match change {
            WorkChange::Registered => "laborer registered",
            WorkChange::Started => "laborer started",
            WorkChange::Stopped => "laborer stopped",
            WorkChange::Paused => "laborer paused",
            WorkChange::Resumed => "laborer resumed",
            WorkChange::Removed => "laborer removed",
        },
        WorkEvent::StateChanged { .. } => "runner state changed",
        WorkEvent::Exited { outcome, .. } if outcome.is_success() => "work exited cleanly",
        WorkEvent::Exited { .. } => "work exited with non-zero code",
        WorkEvent::Faulted { .. } => "work faulted",
    }
}

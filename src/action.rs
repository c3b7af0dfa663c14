/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::action
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Track the lifecycle of the single outstanding update or
    rollback action through an observable state cell, and drive
    mutation calls to their terminal state.

  Security / Safety Notes:
    Completion tokens pass through opaquely; error values carry
    only the service-reported message.

  Dependencies:
    tokio::sync::watch for the single-writer broadcast cell,
    tokio::time::sleep for the settle window.

  Operational Scope:
    One tracker per session. Subscribers receive the latest
    state immediately and every subsequent transition.

  Revision History:
    2025-05-14 KSL  Authored action state machine.
    2025-06-03 KSL  Concurrent starts now rejected explicitly.
    2025-08-25 KSL  Start admission made atomic within the cell.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Started state visible before the call is dispatched
    - Terminal states deferred by the settle window
    - At most one in-flight action at a time
============================================================*/

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::error::{HelmupError, Result};

/// Which mutation the current action represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Update,
    Rollback,
    None,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Update => "update",
            ActionKind::Rollback => "rollback",
            ActionKind::None => "none",
        }
    }
}

/// Lifecycle phase of the current action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    Started,
    Completed,
    Error,
}

impl ActionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionPhase::Idle => "idle",
            ActionPhase::Started => "started",
            ActionPhase::Completed => "completed",
            ActionPhase::Error => "error",
        }
    }

    /// Terminal phases close the action and re-arm the panel.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionPhase::Completed | ActionPhase::Error)
    }
}

/// Latest state of the single outstanding action.
///
/// `value` carries the target version while started, the server
/// completion token once completed, or the error message on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    pub kind: ActionKind,
    pub phase: ActionPhase,
    pub value: String,
}

impl ActionState {
    pub fn idle() -> Self {
        Self {
            kind: ActionKind::None,
            phase: ActionPhase::Idle,
            value: String::new(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.kind.as_str(), self.phase.as_str())
    }
}

impl Default for ActionState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Single-writer, multi-reader cell for the action lifecycle.
///
/// Cloning shares the underlying cell; every subscriber observes the
/// latest state on subscription and every change afterwards.
#[derive(Clone)]
pub struct ActionTracker {
    cell: watch::Sender<ActionState>,
    settle_delay: Duration,
}

impl ActionTracker {
    pub fn new(settle_delay: Duration) -> Self {
        let (cell, _) = watch::channel(ActionState::idle());
        Self { cell, settle_delay }
    }

    /// Snapshot of the latest state.
    pub fn current(&self) -> ActionState {
        self.cell.borrow().clone()
    }

    /// Subscribe to state transitions, starting from the latest value.
    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.cell.subscribe()
    }

    /// Drive an update mutation for `version` through the lifecycle.
    ///
    /// The `started` state is stored before `call` is first polled.
    /// A mutation failure surfaces as an `error` state, not as an
    /// `Err`; only a concurrent start is rejected.
    pub async fn run_update<F>(&self, version: &str, call: F) -> Result<()>
    where
        F: Future<Output = Result<Option<String>>>,
    {
        self.run(ActionKind::Update, version.to_string(), call).await
    }

    /// Drive a rollback mutation through the lifecycle.
    pub async fn run_rollback<F>(&self, call: F) -> Result<()>
    where
        F: Future<Output = Result<Option<String>>>,
    {
        self.run(ActionKind::Rollback, String::new(), call).await
    }

    async fn run<F>(&self, kind: ActionKind, started_value: String, call: F) -> Result<()>
    where
        F: Future<Output = Result<Option<String>>>,
    {
        // Admission and the started emission are one step under the
        // cell's lock, so two racing starts can never both pass.
        let mut blocker: Option<String> = None;
        self.cell.send_if_modified(|state| {
            if state.phase == ActionPhase::Started {
                blocker = Some(state.describe());
                return false;
            }
            *state = ActionState {
                kind,
                phase: ActionPhase::Started,
                value: started_value,
            };
            true
        });
        if let Some(current) = blocker {
            return Err(HelmupError::ActionInFlight { current });
        }

        let outcome = call.await;
        // Hold the resolved call for the settle window so the panel
        // does not flap while the server finishes switching over.
        sleep(self.settle_delay).await;

        let terminal = match outcome {
            Ok(Some(token)) => ActionState {
                kind,
                phase: ActionPhase::Completed,
                value: token,
            },
            // The call resolved without a result; still complete so
            // the panel is never left permanently disabled.
            Ok(None) => ActionState {
                kind,
                phase: ActionPhase::Completed,
                value: String::new(),
            },
            Err(err) => ActionState {
                kind,
                phase: ActionPhase::Error,
                value: err.to_string(),
            },
        };
        self.emit(terminal);
        Ok(())
    }

    fn emit(&self, state: ActionState) {
        // send_replace stores the value even with no live receivers.
        let _ = self.cell.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn tracker() -> ActionTracker {
        ActionTracker::new(Duration::ZERO)
    }

    #[tokio::test]
    async fn started_is_visible_before_the_call_is_polled() {
        let tracker = tracker();
        let observer = tracker.clone();
        tracker
            .run_update("2.1.0", async move {
                // The call future itself sees the started state.
                let state = observer.current();
                assert_eq!(state.kind, ActionKind::Update);
                assert_eq!(state.phase, ActionPhase::Started);
                assert_eq!(state.value, "2.1.0");
                Ok(Some("token-1".to_string()))
            })
            .await
            .unwrap();
        let state = tracker.current();
        assert_eq!(state.phase, ActionPhase::Completed);
        assert_eq!(state.value, "token-1");
    }

    #[tokio::test]
    async fn mutation_error_state_holds_the_message_verbatim() {
        let tracker = tracker();
        tracker
            .run_update("2.1.0", async {
                Err(HelmupError::Mutation("update rejected by server".into()))
            })
            .await
            .unwrap();
        let state = tracker.current();
        assert_eq!(state.kind, ActionKind::Update);
        assert_eq!(state.phase, ActionPhase::Error);
        // No taxonomy prefix; the service message is the value.
        assert_eq!(state.value, "update rejected by server");
    }

    #[tokio::test]
    async fn resolution_without_result_completes_with_empty_value() {
        let tracker = tracker();
        tracker.run_rollback(async { Ok(None) }).await.unwrap();
        let state = tracker.current();
        assert_eq!(state.kind, ActionKind::Rollback);
        assert_eq!(state.phase, ActionPhase::Completed);
        assert_eq!(state.value, "");
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_in_flight() {
        let tracker = tracker();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let runner = tracker.clone();
        let in_flight = tokio::spawn(async move {
            runner
                .run_update("2.1.0", async move {
                    let _ = release_rx.await;
                    Ok(Some("token-2".to_string()))
                })
                .await
        });

        let mut rx = tracker.subscribe();
        rx.wait_for(|state| state.phase == ActionPhase::Started)
            .await
            .unwrap();

        let rejected = tracker.run_rollback(async { Ok(None) }).await;
        assert!(matches!(
            rejected,
            Err(HelmupError::ActionInFlight { .. })
        ));
        // The in-flight state is untouched by the rejected start.
        assert_eq!(tracker.current().kind, ActionKind::Update);

        release_tx.send(()).unwrap();
        in_flight.await.unwrap().unwrap();
        assert_eq!(tracker.current().phase, ActionPhase::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_starts_admit_exactly_one_action() {
        use std::sync::Arc;
        use tokio::sync::{mpsc, Barrier, Notify};
        use tokio::time::timeout;

        let tracker = tracker();
        let barrier = Arc::new(Barrier::new(5));
        let gate = Arc::new(Notify::new());
        let (results_tx, mut results_rx) = mpsc::channel(5);

        for _ in 0..5 {
            let tracker = tracker.clone();
            let barrier = barrier.clone();
            let gate = gate.clone();
            let results_tx = results_tx.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                let result = tracker
                    .run_update("1.5.0", async move {
                        // Only the admitted start polls this call.
                        gate.notified().await;
                        Ok(Some("token-3".to_string()))
                    })
                    .await;
                results_tx.send(result).await.unwrap();
            });
        }

        // The admitted start is parked on the gate; everyone else
        // must come back rejected.
        for _ in 0..4 {
            let result = timeout(Duration::from_secs(5), results_rx.recv())
                .await
                .expect("a losing start should be rejected promptly")
                .unwrap();
            assert!(matches!(result, Err(HelmupError::ActionInFlight { .. })));
        }
        assert_eq!(tracker.current().phase, ActionPhase::Started);

        gate.notify_one();
        let winner = timeout(Duration::from_secs(5), results_rx.recv())
            .await
            .expect("the admitted start should settle")
            .unwrap();
        winner.unwrap();
        let state = tracker.current();
        assert_eq!(state.phase, ActionPhase::Completed);
        assert_eq!(state.value, "token-3");
    }

    #[tokio::test]
    async fn subscribers_observe_every_transition() {
        let tracker = tracker();
        let mut rx = tracker.subscribe();
        assert_eq!(rx.borrow().phase, ActionPhase::Idle);

        tracker
            .run_update("1.5.0", async { Ok(Some("done".to_string())) })
            .await
            .unwrap();

        let final_state = rx
            .wait_for(|state| state.phase.is_terminal())
            .await
            .unwrap()
            .clone();
        assert_eq!(final_state.phase, ActionPhase::Completed);
        assert_eq!(final_state.value, "done");
    }
}

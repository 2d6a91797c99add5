//! Fire-and-forget run jobs.
//!
//! A run is launched detached from whatever triggered it: the caller gets a
//! [`RunJob`] handle back immediately and observes progress only through the
//! job's log stream. The final summary (or run error) travels over a oneshot
//! channel, so a dead task is observable instead of silently lost.

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::RunError;
use crate::logsink::LogSink;
use crate::report::RunSummary;
use crate::runner::{execute_run, RunConfig};

/// Handle to a detached run.
pub struct RunJob {
    pub id: Uuid,
    log: LogSink,
    result_rx: oneshot::Receiver<Result<RunSummary, RunError>>,
    handle: JoinHandle<()>,
}

/// Spawn a run in the background and return its handle immediately.
pub fn spawn_run(config: RunConfig) -> RunJob {
    let id = Uuid::new_v4();
    let log = LogSink::new();
    let (result_tx, result_rx) = oneshot::channel();

    let task_log = log.clone();
    let handle = tokio::spawn(async move {
        task_log.line(format!("Run {id} started"));
        let outcome = execute_run(config, task_log.clone()).await;
        match &outcome {
            Ok(summary) => task_log.line(format!("Run {id} finished: {}", summary.to_line())),
            Err(e) => task_log.line(format!("Run {id} failed: {e}")),
        }
        // The receiver may be gone; the run itself already completed.
        let _ = result_tx.send(outcome);
    });

    RunJob {
        id,
        log,
        result_rx,
        handle,
    }
}

impl RunJob {
    /// Subscribe to the job's progress lines. Receivers that lag too far
    /// behind lose the oldest lines, never block the run.
    pub fn log_stream(&self) -> broadcast::Receiver<String> {
        self.log.subscribe()
    }

    /// Wait for the run to finish and return its summary.
    pub async fn wait(self) -> Result<RunSummary, RunError> {
        match self.result_rx.await {
            Ok(outcome) => outcome,
            // Sender dropped: the task panicked or was torn down.
            Err(_) => match self.handle.await {
                Ok(()) => Err(RunError::Aborted("result channel closed".to_string())),
                Err(e) => Err(RunError::Aborted(e.to_string())),
            },
        }
    }
}

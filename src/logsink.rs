//! Run-owned log/event sink.
//!
//! Each run owns one sink; every progress line goes through it and is
//! mirrored to `tracing`. External observers (the CLI, a future transport
//! adapter) subscribe to the broadcast side and poll at their own pace —
//! there is no process-global log state.

use tokio::sync::broadcast;
use tracing::info;

/// Broadcast capacity. Slow receivers that fall further behind than this
/// lose the oldest lines, never block the run.
const DEFAULT_CAPACITY: usize = 2000;

#[derive(Debug, Clone)]
pub struct LogSink {
    tx: broadcast::Sender<String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        LogSink { tx }
    }

    /// Emit one progress line: timestamped, broadcast, mirrored to tracing.
    pub fn line(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref().trim();
        info!("{}", msg);
        let stamped = format!("[{}] {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        // No subscribers is fine; the run never depends on being observed.
        let _ = self.tx.send(stamped);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_lines_in_order() {
        let sink = LogSink::new();
        let mut rx = sink.subscribe();

        sink.line("first");
        sink.line("second");

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert!(a.ends_with("first"));
        assert!(b.ends_with("second"));
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        let sink = LogSink::new();
        sink.line("nobody listening");
    }
}

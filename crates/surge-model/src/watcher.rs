//! Waiting for the model's completion sentinel.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a wait. `elapsed` is measured from the start of the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Signaled { elapsed: Duration },
    TimedOut { elapsed: Duration },
}

impl WatchOutcome {
    pub fn is_signaled(&self) -> bool {
        matches!(self, WatchOutcome::Signaled { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WatchOutcome::Signaled { elapsed } | WatchOutcome::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Polls for a sentinel file at a fixed interval until it appears or the
/// timeout passes. Suspends the calling task between checks.
#[derive(Debug, Clone, Copy)]
pub struct CompletionWatcher {
    interval: Duration,
    timeout: Duration,
}

impl Default for CompletionWatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(60 * 60))
    }
}

impl CompletionWatcher {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn wait(&self, sentinel: &Path) -> WatchOutcome {
        let start = Instant::now();
        let deadline = start + self.timeout;

        loop {
            if sentinel_present(sentinel).await {
                let elapsed = start.elapsed();
                info!(sentinel = %sentinel.display(), elapsed_secs = elapsed.as_secs_f64(), "Model completion signaled");
                return WatchOutcome::Signaled { elapsed };
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = start.elapsed();
                warn!(
                    sentinel = %sentinel.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Timed out waiting for model completion"
                );
                return WatchOutcome::TimedOut { elapsed };
            }

            let pause = self.interval.min(deadline - now);
            debug!(sentinel = %sentinel.display(), pause_ms = pause.as_millis() as u64, "Sentinel not present yet");
            tokio::time::sleep(pause).await;
        }
    }

    /// Like [`wait`](Self::wait) but returns `None` as soon as `cancel` fires.
    pub async fn wait_cancellable(&self, sentinel: &Path, cancel: &CancellationToken) -> Option<WatchOutcome> {
        tokio::select! {
            outcome = self.wait(sentinel) => Some(outcome),
            _ = cancel.cancelled() => {
                info!(sentinel = %sentinel.display(), "Completion wait cancelled");
                None
            }
        }
    }
}

async fn sentinel_present(path: &Path) -> bool {
    // Permission errors and the like count as "not yet".
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_present_sentinel_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = dir.path().join("log.flag_surge");
        std::fs::write(&sentinel, b"done").unwrap();

        let watcher = CompletionWatcher::new(Duration::from_secs(5), Duration::from_secs(30));
        let outcome = watcher.wait(&sentinel).await;
        assert!(outcome.is_signaled());
        assert!(outcome.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = CompletionWatcher::new(Duration::from_millis(10), Duration::ZERO);
        let outcome = watcher.wait(&dir.path().join("missing")).await;
        assert!(matches!(outcome, WatchOutcome::TimedOut { .. }));
    }
}

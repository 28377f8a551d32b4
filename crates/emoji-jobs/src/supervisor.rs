//! Supervision of detached background tasks.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use emoji_models::JobId;

use crate::metrics;

/// Tracks detached per-job tasks.
///
/// Each task runs on its own and is watched by a companion task in the
/// set. If the task panics or is cancelled, the crash handler runs with a
/// description of the cause so the job can be failed rather than left
/// `RUNNING` forever.
#[derive(Debug, Default)]
pub struct Supervisor {
    tasks: Mutex<JoinSet<()>>,
    running: Arc<AtomicUsize>,
}

/// Counts one task as running until dropped.
struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn new(running: Arc<AtomicUsize>) -> Self {
        let count = running.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_submissions_in_flight(count);
        Self(running)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let count = self.0.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_submissions_in_flight(count);
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` for `job_id`, running `on_crash` if it does not finish normally.
    pub fn spawn<F, C, CF>(&self, job_id: JobId, task: F, on_crash: C)
    where
        F: Future<Output = ()> + Send + 'static,
        C: FnOnce(String) -> CF + Send + 'static,
        CF: Future<Output = ()> + Send + 'static,
    {
        let guard = RunningGuard::new(self.running.clone());
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            let _guard = guard;
            if let Err(e) = handle.await {
                let cause = crash_cause(&e);
                error!(job_id = %job_id, cause = %cause, "Background task crashed");
                on_crash(cause).await;
            }
        });
    }

    /// Number of tasks whose work or crash handling has not finished.
    pub fn in_flight(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for all tracked tasks to finish.
    ///
    /// Returns `true` if everything finished in time. Tasks still running
    /// at the deadline stop being tracked.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        if tasks.is_empty() {
            return true;
        }

        info!(in_flight = tasks.len(), "Draining background tasks");
        let drained = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                remaining = tasks.len(),
                "Background tasks still running after {:?}", timeout
            );
            tasks.detach_all();
        }
        drained
    }
}

fn crash_cause(err: &JoinError) -> String {
    if err.is_cancelled() {
        return "Background submission was cancelled".to_string();
    }
    let message = if err.is_panic() { "panicked" } else { "failed" };
    format!("Background submission {}: {}", message, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let supervisor = Supervisor::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            supervisor.spawn(
                JobId::new(),
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                },
                |_| async {},
            );
        }

        assert!(supervisor.drain(Duration::from_secs(5)).await);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panic_runs_crash_handler() {
        let supervisor = Supervisor::new();
        let cause = Arc::new(Mutex::new(None));

        let seen = cause.clone();
        supervisor.spawn(
            JobId::new(),
            async { panic!("boom"); },
            move |c| async move {
                *seen.lock().unwrap() = Some(c);
            },
        );

        assert!(supervisor.drain(Duration::from_secs(5)).await);
        let cause = cause.lock().unwrap().clone().unwrap();
        assert!(cause.starts_with("Background submission panicked"));
    }

    #[tokio::test]
    async fn test_in_flight_drops_without_reaping() {
        let supervisor = Supervisor::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        supervisor.spawn(
            JobId::new(),
            async move {
                let _ = rx.await;
            },
            |_| async {},
        );
        assert_eq!(supervisor.in_flight(), 1);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while supervisor.in_flight() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("finished task should stop counting as in flight");
    }

    #[tokio::test]
    async fn test_drain_times_out() {
        let supervisor = Supervisor::new();
        supervisor.spawn(
            JobId::new(),
            tokio::time::sleep(Duration::from_secs(60)),
            |_| async {},
        );

        assert!(!supervisor.drain(Duration::from_millis(10)).await);
    }
}

use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Fan-out/fan-in helper: many tracked workers, one shared output queue.
///
/// The queue closes only after [`WorkerPool::finish`] has seen every worker
/// complete, regardless of which worker finished last.
pub struct WorkerPool<T> {
    tracker: TaskTracker,
    output: mpsc::Sender<T>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(output: mpsc::Sender<T>, cancel: CancellationToken) -> Self {
        Self {
            tracker: TaskTracker::new(),
            output,
            cancel,
        }
    }

    /// Runs `work` on its own task and publishes its output once.
    ///
    /// Work still in flight when cancellation fires is dropped unsent.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let output = self.output.clone();
        let cancel = self.cancel.clone();
        self.tracker.spawn(
            async move {
                let item = tokio::select! {
                    () = cancel.cancelled() => return,
                    item = work => item,
                };
                tokio::select! {
                    () = cancel.cancelled() => {}
                    _ = output.send(item) => {}
                }
            }
            .in_current_span(),
        );
    }

    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits for every spawned worker, then closes the output queue.
    pub async fn finish(self) {
        self.tracker.close();
        self.tracker.wait().await;
        drop(self.output);
    }
}

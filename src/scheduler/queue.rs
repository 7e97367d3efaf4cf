//! FIFO waiting queue for submitted-but-not-yet-running tasks.
//!
//! Tasks wait here whenever every resource in the pool is busy. Ordering is
//! strictly first-in-first-out: the head of the queue is always the next
//! task to receive a freed resource. Each entry carries a monotonic
//! sequence number so a cancellation watcher can remove it without running
//! it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::core::ResourceLease;

/// Type-erased task body: consumes a resource lease and drives itself to
/// completion (the lease drop releases the resource).
pub(crate) type TaskFn<R> = Box<dyn FnOnce(ResourceLease<R>) + Send>;

/// Sequence counter for queue entry identity.
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A task waiting for a resource.
///
/// Dropping a `QueuedTask` without running it drops the task body, which in
/// turn drops the caller's result sender; the caller's handle then resolves
/// as cancelled. Taking the body with [`into_run`](Self::into_run) drops the
/// claim sender, which stops the entry's cancellation watcher.
pub(crate) struct QueuedTask<R: Send + 'static> {
    seq: u64,
    run: TaskFn<R>,
    cancellation: CancellationToken,
    _claimed: oneshot::Sender<()>,
}

impl<R: Send + 'static> QueuedTask<R> {
    /// Wrap a task body for queueing.
    ///
    /// Returns the entry and the receiver half of its claim signal; the
    /// receiver completes (with a closed-channel error) as soon as the
    /// entry is dispatched or discarded.
    pub fn new(run: TaskFn<R>, cancellation: CancellationToken) -> (Self, oneshot::Receiver<()>) {
        let (claimed_tx, claimed_rx) = oneshot::channel();
        let task = Self {
            seq: next_sequence(),
            run,
            cancellation,
            _claimed: claimed_tx,
        };
        (task, claimed_rx)
    }

    /// Queue entry identity.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether this entry's cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Take the task body for execution, releasing the claim signal.
    pub fn into_run(self) -> TaskFn<R> {
        self.run
    }
}

impl<R: Send + 'static> std::fmt::Debug for QueuedTask<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTask")
            .field("seq", &self.seq)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// FIFO queue of waiting tasks.
///
/// Not thread-safe on its own; the scheduler wraps it in a mutex.
pub(crate) struct WaitQueue<R: Send + 'static> {
    tasks: VecDeque<QueuedTask<R>>,
}

impl<R: Send + 'static> std::fmt::Debug for WaitQueue<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitQueue").field("len", &self.len()).finish()
    }
}

impl<R: Send + 'static> WaitQueue<R> {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Append a task at the tail.
    pub fn push_back(&mut self, task: QueuedTask<R>) {
        self.tasks.push_back(task);
    }

    /// Dequeue the next runnable task.
    ///
    /// Entries whose cancellation token fired inside the removal race
    /// window are discarded here instead of dispatched; dropping them
    /// resolves their handles as cancelled.
    pub fn pop_ready(&mut self) -> Option<QueuedTask<R>> {
        while let Some(task) = self.tasks.pop_front() {
            if task.is_cancelled() {
                trace!(seq = task.seq(), "discarding cancelled task at dispatch");
                continue;
            }
            return Some(task);
        }
        None
    }

    /// Remove a specific entry by sequence number.
    pub fn remove(&mut self, seq: u64) -> Option<QueuedTask<R>> {
        let index = self.tasks.iter().position(|task| task.seq() == seq)?;
        self.tasks.remove(index)
    }

    /// Number of waiting tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_task(
        cancellation: CancellationToken,
    ) -> (QueuedTask<()>, oneshot::Receiver<()>) {
        QueuedTask::new(Box::new(|_lease| {}), cancellation)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = WaitQueue::new();
        let (first, _rx1) = noop_task(CancellationToken::new());
        let (second, _rx2) = noop_task(CancellationToken::new());
        let first_seq = first.seq();
        let second_seq = second.seq();

        queue.push_back(first);
        queue.push_back(second);

        assert_eq!(queue.pop_ready().unwrap().seq(), first_seq);
        assert_eq!(queue.pop_ready().unwrap().seq(), second_seq);
        assert!(queue.pop_ready().is_none());
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let (a, _rx_a) = noop_task(CancellationToken::new());
        let (b, _rx_b) = noop_task(CancellationToken::new());
        assert!(a.seq() < b.seq());
    }

    #[test]
    fn test_pop_ready_skips_cancelled_entries() {
        let mut queue = WaitQueue::new();
        let cancelled = CancellationToken::new();
        let (first, _rx1) = noop_task(cancelled.clone());
        let (second, _rx2) = noop_task(CancellationToken::new());
        let second_seq = second.seq();

        queue.push_back(first);
        queue.push_back(second);
        cancelled.cancel();

        assert_eq!(queue.pop_ready().unwrap().seq(), second_seq);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_remove_by_sequence() {
        let mut queue = WaitQueue::new();
        let (first, _rx1) = noop_task(CancellationToken::new());
        let (second, _rx2) = noop_task(CancellationToken::new());
        let first_seq = first.seq();
        let second_seq = second.seq();

        queue.push_back(first);
        queue.push_back(second);

        assert!(queue.remove(second_seq).is_some());
        assert_eq!(queue.len(), 1);
        assert!(queue.remove(second_seq).is_none());
        assert_eq!(queue.pop_ready().unwrap().seq(), first_seq);
    }

    #[tokio::test]
    async fn test_claim_signal_fires_when_body_taken() {
        let (task, claimed) = noop_task(CancellationToken::new());
        let _run = task.into_run();

        // Sender dropped with the entry; the watcher side unblocks.
        assert!(claimed.await.is_err());
    }
}

//! The bounded resource scheduler.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::handle::{SubmitError, TaskHandle};
use super::queue::{QueuedTask, TaskFn, WaitQueue};

/// FIFO task scheduler bounded by a fixed pool of opaque resources.
///
/// Each resource represents one unit of concurrency capacity: at any
/// instant the number of executing tasks equals the number of busy
/// resources, bounded by the pool size, and no resource is ever borrowed
/// by two tasks at once. Tasks that cannot dispatch immediately wait in a
/// FIFO queue and run strictly in submission order as resources free up.
///
/// The scheduler is cheaply cloneable (a shared handle) and may be used
/// concurrently by any number of independent submitters. Dispatch decisions
/// are made synchronously at submission time and at each task completion;
/// the scheduler itself never blocks.
///
/// [`submit`](Self::submit) must be called within a Tokio runtime: task
/// bodies and cancellation watchers run on spawned tasks.
pub struct Scheduler<R: Send + 'static> {
    inner: Arc<Inner<R>>,
}

impl<R: Send + 'static> Clone for Scheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R: Send + 'static> {
    state: Mutex<State<R>>,
    capacity: usize,
}

struct State<R: Send + 'static> {
    idle: Vec<R>,
    waiting: WaitQueue<R>,
}

impl<R: Send + 'static> Scheduler<R> {
    /// Create a scheduler owning the given resources for its lifetime.
    ///
    /// Resources are never duplicated or destroyed mid-run; they only move
    /// between the idle pool and at most one in-flight task.
    ///
    /// # Panics
    ///
    /// Panics if `resources` is empty.
    pub fn new(resources: Vec<R>) -> Self {
        assert!(
            !resources.is_empty(),
            "scheduler requires at least one resource"
        );
        let capacity = resources.len();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    idle: resources,
                    waiting: WaitQueue::new(),
                }),
                capacity,
            }),
        }
    }

    /// Total number of resources in the pool.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of resources currently idle.
    pub fn idle_count(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Number of tasks waiting for a resource.
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().waiting.len()
    }

    /// Submit a task for execution against one of the pool's resources.
    ///
    /// If an idle resource exists the task is dispatched immediately;
    /// otherwise it joins the FIFO waiting queue. The returned handle
    /// resolves with the task's own result once it has run, or with
    /// [`SubmitError::Cancelled`] if `cancellation` fires before a
    /// resource was ever assigned (the body is then never invoked).
    ///
    /// A token firing after dispatch does not preempt the running task;
    /// in-flight cancellation is the task body's cooperative concern.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use quilter::scheduler::Scheduler;
    /// # use tokio_util::sync::CancellationToken;
    /// # use futures::FutureExt;
    /// # async fn run() {
    /// let scheduler = Scheduler::new(vec![1u32, 2u32]);
    /// let handle = scheduler.submit(
    ///     |slot: &mut u32| {
    ///         let id = *slot;
    ///         async move { Ok::<_, std::convert::Infallible>(id) }.boxed()
    ///     },
    ///     CancellationToken::new(),
    /// );
    /// let ran_on = handle.await.unwrap();
    /// # let _ = ran_on;
    /// # }
    /// ```
    pub fn submit<T, E, F>(&self, task: F, cancellation: CancellationToken) -> TaskHandle<T, E>
    where
        F: for<'r> FnOnce(&'r mut R) -> BoxFuture<'r, Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let handle = TaskHandle::new(result_rx);

        // Pre-submission cancellation: never queued, never dispatched.
        // Dropping the sender resolves the handle as cancelled.
        if cancellation.is_cancelled() {
            debug!("task already cancelled at submission");
            return handle;
        }

        let run: TaskFn<R> = Box::new(move |mut lease: ResourceLease<R>| {
            tokio::spawn(async move {
                let result = task(lease.resource_mut()).await;
                let _ = result_tx.send(result.map_err(SubmitError::Task));
                // The lease drops here, releasing the resource exactly once
                // and dispatching the queue head if any.
            });
        });

        let placement = {
            let mut state = self.inner.state.lock();
            match state.idle.pop() {
                Some(resource) => Placement::Dispatch(resource, run),
                None => {
                    let (queued, claimed) = QueuedTask::new(run, cancellation.clone());
                    let seq = queued.seq();
                    state.waiting.push_back(queued);
                    Placement::Queued(seq, claimed)
                }
            }
        };

        match placement {
            Placement::Dispatch(resource, run) => {
                trace!("dispatching task immediately");
                run(ResourceLease::new(Arc::clone(&self.inner), resource));
            }
            Placement::Queued(seq, claimed) => {
                trace!(seq, "task queued, pool exhausted");
                self.spawn_cancel_watcher(seq, cancellation, claimed);
            }
        }

        handle
    }

    /// Watch a queued task's cancellation token and remove the entry if it
    /// fires before dispatch. The claim signal completes when the entry is
    /// dispatched or discarded, ending the watcher.
    fn spawn_cancel_watcher(
        &self,
        seq: u64,
        cancellation: CancellationToken,
        mut claimed: oneshot::Receiver<()>,
    ) {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    if let Some(inner) = inner.upgrade() {
                        let removed = inner.state.lock().waiting.remove(seq);
                        if removed.is_some() {
                            debug!(seq, "task cancelled while queued");
                        }
                        // Dropping the removed entry resolves its handle.
                    }
                }
                _ = &mut claimed => {}
            }
        });
    }
}

enum Placement<R: Send + 'static> {
    Dispatch(R, TaskFn<R>),
    Queued(u64, oneshot::Receiver<()>),
}

impl<R: Send + 'static> Inner<R> {
    /// Return a resource to the pool and dispatch the queue head, if any.
    ///
    /// Called exactly once per lease, on task completion (success or
    /// failure alike).
    fn release(inner: &Arc<Self>, resource: R) {
        let next = {
            let mut state = inner.state.lock();
            match state.waiting.pop_ready() {
                Some(task) => task,
                None => {
                    state.idle.push(resource);
                    trace!(idle = state.idle.len(), "resource returned to pool");
                    return;
                }
            }
        };

        trace!(seq = next.seq(), "handing freed resource to queue head");
        let run = next.into_run();
        run(ResourceLease::new(Arc::clone(inner), resource));
    }
}

/// Exclusive borrow of one pool resource for the duration of one task.
///
/// Dropping the lease returns the resource to the pool and synchronously
/// dispatches the next waiting task, so release happens exactly once per
/// task regardless of outcome.
pub(crate) struct ResourceLease<R: Send + 'static> {
    resource: Option<R>,
    inner: Arc<Inner<R>>,
}

impl<R: Send + 'static> ResourceLease<R> {
    fn new(inner: Arc<Inner<R>>, resource: R) -> Self {
        Self {
            resource: Some(resource),
            inner,
        }
    }

    pub(crate) fn resource_mut(&mut self) -> &mut R {
        self.resource
            .as_mut()
            .expect("resource present until lease drop")
    }
}

impl<R: Send + 'static> Drop for ResourceLease<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            Inner::release(&self.inner, resource);
        }
    }
}

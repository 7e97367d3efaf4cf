//! Eventual results for submitted tasks.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// Why a submitted task did not produce a value.
#[derive(Debug, Error)]
pub enum SubmitError<E> {
    /// The task's cancellation token fired before a resource was assigned.
    ///
    /// The task body was never invoked. Cancellation after dispatch is
    /// cooperative and is the task body's own concern; the scheduler only
    /// observes the token before dispatch.
    #[error("task cancelled before dispatch")]
    Cancelled,

    /// The task body ran and returned an error.
    ///
    /// Failures are isolated per task; the resource was still released.
    #[error("task failed: {0}")]
    Task(E),
}

impl<E> SubmitError<E> {
    /// Returns true if the task was cancelled before dispatch.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the task's own error, if the task ran and failed.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            Self::Cancelled => None,
            Self::Task(e) => Some(e),
        }
    }
}

/// The eventual result of [`Scheduler::submit`](crate::scheduler::Scheduler::submit).
///
/// Resolves exactly once: with the task's return value, with the task's own
/// error wrapped in [`SubmitError::Task`], or with [`SubmitError::Cancelled`]
/// if the task was removed from the waiting queue before dispatch (or the
/// scheduler was dropped while the task was still queued).
#[derive(Debug)]
pub struct TaskHandle<T, E> {
    rx: oneshot::Receiver<Result<T, SubmitError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, SubmitError<E>>>) -> Self {
        Self { rx }
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, SubmitError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|received| {
            match received {
                Ok(result) => result,
                // The result sender was dropped without completing: the task
                // was discarded before it ever ran.
                Err(_) => Err(SubmitError::Cancelled),
            }
        })
    }
}

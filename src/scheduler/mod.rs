//! Bounded resource scheduling for asynchronous tasks.
//!
//! A [`Scheduler`] owns a fixed pool of caller-supplied opaque resources
//! (model handles, worker channels, connections) and runs submitted tasks
//! against them, at most one task per resource at a time. When the pool is
//! exhausted, tasks wait in a strict FIFO queue: no priorities, no
//! starvation, every queued task eventually runs once earlier tasks
//! complete.
//!
//! Cancellation is pre-dispatch only: a [`CancellationToken`] that fires
//! while a task is still queued removes it without ever invoking its body
//! or assigning it a resource; a token firing after dispatch is the task
//! body's own cooperative concern.
//!
//! The scheduler knows nothing about image geometry; it composes with the
//! [`patch`](crate::patch) module purely through the submission contract.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod core;
mod handle;
mod queue;

pub use self::core::Scheduler;
pub use handle::{SubmitError, TaskHandle};

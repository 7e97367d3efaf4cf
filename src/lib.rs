//! Quilter - concurrent patch-based image processing.
//!
//! This library decomposes a raster image into a deterministic set of
//! overlapping square patches, drives an arbitrary per-patch transformation,
//! and reassembles the transformed patches into an output image of identical
//! dimensions. Alongside the tiling machinery it provides a bounded resource
//! scheduler for running per-patch work against a fixed pool of shared
//! execution contexts (e.g. model handles or worker channels).
//!
//! The two halves compose only through the task submission contract: the
//! [`patch`] module knows nothing about concurrency, and the [`scheduler`]
//! module knows nothing about image geometry.
//!
//! # Example
//!
//! ```no_run
//! use quilter::patch::PatchProcessor;
//! use quilter::scheduler::Scheduler;
//! use tokio_util::sync::CancellationToken;
//! use futures::FutureExt;
//! use image::RgbaImage;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = RgbaImage::new(640, 480);
//! let processor = PatchProcessor::new(&source, 256, 32)?;
//!
//! // One concurrency slot per opaque resource handle.
//! let scheduler = Scheduler::new(vec!["model-a", "model-b"]);
//!
//! let output = processor
//!     .process(|patch| {
//!         let scheduler = scheduler.clone();
//!         async move {
//!             scheduler
//!                 .submit(
//!                     move |_resource: &mut &str| {
//!                         async move { Ok::<_, std::convert::Infallible>(patch) }.boxed()
//!                     },
//!                     CancellationToken::new(),
//!                 )
//!                 .await
//!                 .map_err(Into::into)
//!         }
//!     })
//!     .await?;
//!
//! assert_eq!(output.dimensions(), source.dimensions());
//! # Ok(())
//! # }
//! ```

pub mod patch;
pub mod scheduler;

pub use patch::{Patch, PatchPlan, PatchPlanError, PatchPosition, PatchProcessor, ProcessError};
pub use scheduler::{Scheduler, SubmitError, TaskHandle};

//! Overlapping-patch tiling and reassembly.
//!
//! This module splits an image into a deterministic, ordered set of square
//! patches with a guaranteed minimum overlap, and stitches transformed
//! patches back into a full-size output:
//!
//! - [`PatchPlan`] computes the per-axis coordinates and the ordered recipe
//!   of patch positions covering the image.
//! - [`PatchProcessor`] extracts patch pixel data from a source image and
//!   drives an async per-patch transformation over the whole recipe.
//! - [`Stitcher`] reassembles transformed patches into the output canvas.
//!
//! # Overlap semantics
//!
//! Overlap exists to give the per-patch transformation contextual margin
//! across patch boundaries; it is not a blending mechanism. Where patches
//! overlap, the patch that appears later in recipe order wins outright
//! (Y-outer/X-inner iteration, so the bottom-right-most contributor along
//! each axis). Reassembly is a plain overwrite, which keeps the output
//! pixel-exact under an identity transformation.

mod plan;
mod processor;
mod stitch;

pub use plan::{PatchPlan, PatchPlanError, PatchPosition};
pub use processor::{BoxError, Patch, PatchProcessor, ProcessError};
pub use stitch::Stitcher;

//! Patch extraction and the per-patch processing loop.

use std::future::Future;

use image::{imageops, RgbaImage};
use thiserror::Error;
use tracing::debug;

use super::plan::{PatchPlan, PatchPlanError, PatchPosition};
use super::stitch::Stitcher;

/// Boxed opaque error produced by a caller-supplied transformation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while driving a patch transformation over a plan.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The caller-supplied transformation failed for one patch.
    ///
    /// The whole run aborts; callers needing partial-failure tolerance
    /// must handle per-patch errors inside the transformation itself.
    #[error("patch transform failed at {position}: {source}")]
    Transform {
        /// Position of the patch whose transformation failed.
        position: PatchPosition,
        /// The transformation's own error.
        source: BoxError,
    },

    /// A transformed patch came back with the wrong dimensions.
    #[error(
        "transformed patch at {position} is {actual_width}x{actual_height}, \
         expected {expected}x{expected}"
    )]
    PatchSizeMismatch {
        /// Position the patch was destined for.
        position: PatchPosition,
        /// Expected edge length.
        expected: u32,
        /// Actual width of the transformed patch.
        actual_width: u32,
        /// Actual height of the transformed patch.
        actual_height: u32,
    },

    /// Copying a patch into the output canvas failed.
    #[error("failed to place patch at {position}")]
    Stitch {
        /// Position the patch was destined for.
        position: PatchPosition,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },
}

/// A materialized square sub-image extracted at a plan position.
///
/// Produced lazily by [`PatchProcessor::extract`], handed to the
/// transformation once, and discarded after stitching.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Where this patch was extracted from (and will be stitched back to).
    pub position: PatchPosition,
    /// The patch's pixel data, `patch_size x patch_size` RGBA.
    pub pixels: RgbaImage,
}

/// Drives an async per-patch transformation over a planned image.
///
/// The processor borrows the source image for the lifetime of one run; the
/// plan is computed at construction and immutable afterwards. It knows
/// nothing about concurrency: the transformation callback is free to fan
/// work out through a [`Scheduler`](crate::scheduler::Scheduler) or run
/// inline.
#[derive(Debug)]
pub struct PatchProcessor<'a> {
    image: &'a RgbaImage,
    plan: PatchPlan,
}

impl<'a> PatchProcessor<'a> {
    /// Create a processor for `image` with the given patch geometry.
    ///
    /// # Errors
    ///
    /// Returns [`PatchPlanError`] if the overlap is not smaller than the
    /// patch size, or the patch does not fit inside the image.
    pub fn new(
        image: &'a RgbaImage,
        patch_size: u32,
        min_overlap: u32,
    ) -> Result<Self, PatchPlanError> {
        let (width, height) = image.dimensions();
        let plan = PatchPlan::new(width, height, patch_size, min_overlap)?;
        Ok(Self { image, plan })
    }

    /// The computed patch plan (the recipe).
    pub fn plan(&self) -> &PatchPlan {
        &self.plan
    }

    /// Copy the pixel block for one patch out of the source image.
    ///
    /// Plan positions are always fully inside the image, so extraction
    /// needs no bounds clamping.
    pub fn extract(&self, position: PatchPosition) -> Patch {
        let size = self.plan.patch_size();
        let pixels = imageops::crop_imm(self.image, position.x, position.y, size, size).to_image();
        Patch { position, pixels }
    }

    /// Run `transform` over every patch in recipe order and reassemble the
    /// output image.
    ///
    /// The callback is invoked exactly once per plan position. Transformed
    /// patches are stitched back in recipe order, later patches overwriting
    /// earlier ones where they overlap.
    ///
    /// # Errors
    ///
    /// The first callback error aborts the run with
    /// [`ProcessError::Transform`]; a transformed patch of the wrong size
    /// fails with [`ProcessError::PatchSizeMismatch`].
    pub async fn process<F, Fut>(&self, mut transform: F) -> Result<RgbaImage, ProcessError>
    where
        F: FnMut(Patch) -> Fut,
        Fut: Future<Output = Result<Patch, BoxError>>,
    {
        let (width, height) = self.image.dimensions();
        let mut stitcher = Stitcher::new(width, height, self.plan.patch_size());

        for &position in self.plan.positions() {
            let patch = self.extract(position);
            let transformed = transform(patch)
                .await
                .map_err(|source| ProcessError::Transform { position, source })?;
            stitcher.place(position, &transformed.pixels)?;
        }

        debug!(
            width,
            height,
            patches = self.plan.len(),
            "Processed all patches"
        );
        Ok(stitcher.into_image())
    }
}

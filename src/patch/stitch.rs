//! Patch reassembly into a full-size output image.

use image::{GenericImage, RgbaImage};
use tracing::trace;

use super::plan::PatchPosition;
use super::processor::ProcessError;

/// Reassembles transformed patches into an output canvas.
///
/// The canvas is allocated once, zero-initialized, at the source image's
/// dimensions. Each placed patch overwrites whatever was previously written
/// under its footprint, so the final value of any pixel comes from the last
/// patch in recipe order that covers it. No blending is performed.
#[derive(Debug)]
pub struct Stitcher {
    canvas: RgbaImage,
    patch_size: u32,
}

impl Stitcher {
    /// Create a stitcher for an output of `width x height` assembled from
    /// square patches of `patch_size`.
    pub fn new(width: u32, height: u32, patch_size: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            patch_size,
        }
    }

    /// Copy a transformed patch into the canvas at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::PatchSizeMismatch`] if the patch is not
    /// exactly `patch_size x patch_size`, and [`ProcessError::Stitch`] if
    /// the copy fails (a position outside the canvas, which a plan-derived
    /// position never produces).
    pub fn place(&mut self, position: PatchPosition, pixels: &RgbaImage) -> Result<(), ProcessError> {
        let (actual_width, actual_height) = pixels.dimensions();
        if actual_width != self.patch_size || actual_height != self.patch_size {
            return Err(ProcessError::PatchSizeMismatch {
                position,
                expected: self.patch_size,
                actual_width,
                actual_height,
            });
        }

        self.canvas
            .copy_from(pixels, position.x, position.y)
            .map_err(|source| ProcessError::Stitch { position, source })?;

        trace!(x = position.x, y = position.y, "Placed patch");
        Ok(())
    }

    /// Output dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    /// Consume the stitcher and return the assembled image.
    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(size: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(size, size, image::Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_place_copies_patch_block() {
        let mut stitcher = Stitcher::new(8, 8, 4);
        stitcher.place(PatchPosition::new(4, 4), &solid(4, 9)).unwrap();

        let out = stitcher.into_image();
        assert_eq!(out.get_pixel(4, 4).0, [9, 9, 9, 255]);
        assert_eq!(out.get_pixel(7, 7).0, [9, 9, 9, 255]);
        // Outside the patch footprint the canvas stays zeroed.
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_later_patch_overwrites_earlier() {
        let mut stitcher = Stitcher::new(6, 4, 4);
        stitcher.place(PatchPosition::new(0, 0), &solid(4, 1)).unwrap();
        stitcher.place(PatchPosition::new(2, 0), &solid(4, 2)).unwrap();

        let out = stitcher.into_image();
        // Overlap columns 2..4 belong to the later patch, unconditionally.
        assert_eq!(out.get_pixel(1, 1).0, [1, 1, 1, 255]);
        assert_eq!(out.get_pixel(2, 1).0, [2, 2, 2, 255]);
        assert_eq!(out.get_pixel(3, 3).0, [2, 2, 2, 255]);
    }

    #[test]
    fn test_wrong_patch_size_rejected() {
        let mut stitcher = Stitcher::new(8, 8, 4);
        let err = stitcher
            .place(PatchPosition::new(0, 0), &solid(3, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::PatchSizeMismatch {
                expected: 4,
                actual_width: 3,
                actual_height: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_bounds_position_is_stitch_error() {
        let mut stitcher = Stitcher::new(8, 8, 4);
        let err = stitcher
            .place(PatchPosition::new(6, 6), &solid(4, 1))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Stitch { .. }));
    }
}

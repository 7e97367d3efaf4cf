//! Patch placement planning.
//!
//! A [`PatchPlan`] is the deterministic, ordered list of top-left patch
//! positions covering an image of known dimensions with square patches of a
//! fixed edge length and a minimum overlap between neighbours.
//!
//! The per-axis coordinate sets are computed independently for X (against
//! the width) and Y (against the height), then crossed with Y as the outer
//! loop. The recipe order is an external contract: the stitcher paints
//! later patches over earlier ones, so overlap regions resolve to the
//! bottom-right-most contributing patch along each axis.

use thiserror::Error;
use tracing::debug;

/// Errors raised while validating patch plan parameters.
///
/// These are construction-time failures; no plan is produced and no partial
/// state is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchPlanError {
    /// The requested overlap leaves no forward progress between patches.
    #[error("minimum overlap ({min_overlap}) must be less than patch size ({patch_size})")]
    OverlapTooLarge {
        /// Requested minimum overlap in pixels.
        min_overlap: u32,
        /// Requested patch edge length in pixels.
        patch_size: u32,
    },

    /// The patch does not fit inside the image on at least one axis.
    #[error("patch size ({patch_size}) must be positive and no larger than the image ({width}x{height})")]
    PatchTooLarge {
        /// Requested patch edge length in pixels.
        patch_size: u32,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
}

/// Top-left offset of one square patch within the source image.
///
/// For every position generated by a plan, `x + patch_size <= width` and
/// `y + patch_size <= height` hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchPosition {
    /// Horizontal offset of the patch's left edge.
    pub x: u32,
    /// Vertical offset of the patch's top edge.
    pub y: u32,
}

impl PatchPosition {
    /// Create a new patch position.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for PatchPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Deterministic ordered recipe of patch positions covering an image.
///
/// Immutable once computed. Positions are ordered with the Y coordinate as
/// the outer loop and X as the inner loop; iteration order determines the
/// stitching overwrite order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    positions: Vec<PatchPosition>,
    patch_size: u32,
    width: u32,
    height: u32,
}

impl PatchPlan {
    /// Compute the patch plan for an image of `width x height`.
    ///
    /// # Arguments
    ///
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `patch_size` - Edge length of every square patch
    /// * `min_overlap` - Minimum shared margin between adjacent patches
    ///
    /// # Errors
    ///
    /// Returns [`PatchPlanError::OverlapTooLarge`] if `min_overlap >=
    /// patch_size`, and [`PatchPlanError::PatchTooLarge`] if the patch is
    /// empty or exceeds either image dimension.
    pub fn new(
        width: u32,
        height: u32,
        patch_size: u32,
        min_overlap: u32,
    ) -> Result<Self, PatchPlanError> {
        if min_overlap >= patch_size {
            return Err(PatchPlanError::OverlapTooLarge {
                min_overlap,
                patch_size,
            });
        }
        if patch_size == 0 || patch_size > width || patch_size > height {
            return Err(PatchPlanError::PatchTooLarge {
                patch_size,
                width,
                height,
            });
        }

        let step = patch_size - min_overlap;
        let xs = axis_positions(width, patch_size, step);
        let ys = axis_positions(height, patch_size, step);

        let mut positions = Vec::with_capacity(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                positions.push(PatchPosition::new(x, y));
            }
        }

        debug!(
            width,
            height,
            patch_size,
            min_overlap,
            columns = xs.len(),
            rows = ys.len(),
            patches = positions.len(),
            "Computed patch plan"
        );

        Ok(Self {
            positions,
            patch_size,
            width,
            height,
        })
    }

    /// The ordered patch positions (the recipe).
    pub fn positions(&self) -> &[PatchPosition] {
        &self.positions
    }

    /// Number of patches in the plan.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the plan holds no patches.
    ///
    /// Never the case for a successfully constructed plan; present for
    /// API completeness alongside [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Patch edge length in pixels.
    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    /// Width of the planned image.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the planned image.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl<'a> IntoIterator for &'a PatchPlan {
    type Item = &'a PatchPosition;
    type IntoIter = std::slice::Iter<'a, PatchPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

/// Compute the patch coordinates along one axis.
///
/// Starts at 0 and advances by `step` for as long as the next patch would
/// end strictly inside the axis, then appends the clamped final position
/// `dim - patch_size` unless the stepping already landed on it. The result
/// is strictly increasing, begins at 0 and ends at `dim - patch_size`.
///
/// Intermediate sums are widened to `u64`: `last + step + patch_size` can
/// exceed `u32::MAX` for dimensions near the top of the range. Every kept
/// position is below `dim`, so the narrowing back is lossless.
fn axis_positions(dim: u32, patch_size: u32, step: u32) -> Vec<u32> {
    debug_assert!(step > 0);
    debug_assert!(patch_size <= dim);

    let dim = u64::from(dim);
    let patch_size = u64::from(patch_size);
    let step = u64::from(step);

    let mut positions = vec![0u64];
    loop {
        let next = positions.last().copied().unwrap_or(0) + step;
        if next + patch_size >= dim {
            break;
        }
        positions.push(next);
    }

    let last = dim - patch_size;
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions.into_iter().map(|position| position as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_positions_with_remainder() {
        // 64 wide, 32 patch, 24 step: stepping gives 0, 24; clamp adds 32.
        assert_eq!(axis_positions(64, 32, 24), vec![0, 24, 32]);
    }

    #[test]
    fn test_axis_positions_clamp_only() {
        // 48 tall, 32 patch, 24 step: no step fits, clamp adds 16.
        assert_eq!(axis_positions(48, 32, 24), vec![0, 16]);
    }

    #[test]
    fn test_axis_positions_exact_division() {
        // Zero overlap over an evenly dividing axis: the clamp supplies the
        // final position, the stepping rule stops strictly before the edge.
        assert_eq!(axis_positions(96, 32, 32), vec![0, 32, 64]);
    }

    #[test]
    fn test_axis_positions_single_patch() {
        assert_eq!(axis_positions(32, 32, 24), vec![0]);
    }

    #[test]
    fn test_axis_positions_near_u32_max() {
        // One step lands one pixel past the lone clamp position; the sums
        // involved exceed u32::MAX and must not overflow.
        assert_eq!(
            axis_positions(u32::MAX, u32::MAX - 1, u32::MAX - 1),
            vec![0, 1]
        );
    }

    #[test]
    fn test_recipe_matches_reference_case() {
        let plan = PatchPlan::new(64, 48, 32, 8).unwrap();
        let expected = [
            PatchPosition::new(0, 0),
            PatchPosition::new(24, 0),
            PatchPosition::new(32, 0),
            PatchPosition::new(0, 16),
            PatchPosition::new(24, 16),
            PatchPosition::new(32, 16),
        ];
        assert_eq!(plan.positions(), &expected);
    }

    #[test]
    fn test_overlap_equal_to_patch_size_rejected() {
        let err = PatchPlan::new(32, 32, 16, 16).unwrap_err();
        assert_eq!(
            err.to_string(),
            "minimum overlap (16) must be less than patch size (16)"
        );
    }

    #[test]
    fn test_overlap_larger_than_patch_size_rejected() {
        let err = PatchPlan::new(64, 64, 16, 20).unwrap_err();
        assert!(matches!(err, PatchPlanError::OverlapTooLarge { .. }));
    }

    #[test]
    fn test_patch_larger_than_image_rejected() {
        let err = PatchPlan::new(30, 64, 32, 8).unwrap_err();
        assert!(matches!(
            err,
            PatchPlanError::PatchTooLarge {
                patch_size: 32,
                width: 30,
                height: 64
            }
        ));
    }

    #[test]
    fn test_zero_patch_size_rejected() {
        // The overlap check fires first: 0 >= 0.
        let err = PatchPlan::new(64, 64, 0, 0).unwrap_err();
        assert!(matches!(err, PatchPlanError::OverlapTooLarge { .. }));
    }

    #[test]
    fn test_positions_stay_within_bounds() {
        let plan = PatchPlan::new(100, 70, 32, 10).unwrap();
        for pos in &plan {
            assert!(pos.x + plan.patch_size() <= plan.width());
            assert!(pos.y + plan.patch_size() <= plan.height());
        }
    }

    #[test]
    fn test_axis_coverage_and_step_contract() {
        // Every axis set starts at 0, ends at dim - patch, and advances by
        // exactly patch - overlap except possibly the final clamped step.
        let (dim, patch, overlap) = (250u32, 64u32, 16u32);
        let coords = axis_positions(dim, patch, patch - overlap);

        assert_eq!(*coords.first().unwrap(), 0);
        assert_eq!(*coords.last().unwrap(), dim - patch);
        for pair in coords.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for pair in coords[..coords.len() - 1].windows(2) {
            assert_eq!(pair[1] - pair[0], patch - overlap);
        }
    }

    #[test]
    fn test_row_major_ordering() {
        let plan = PatchPlan::new(64, 64, 32, 8).unwrap();
        // Y must never decrease; X resets at each new row.
        let mut prev_y = 0;
        for pos in plan.positions() {
            assert!(pos.y >= prev_y);
            prev_y = pos.y;
        }
        assert_eq!(plan.positions().first(), Some(&PatchPosition::new(0, 0)));
    }

    #[test]
    fn test_plan_accessors() {
        let plan = PatchPlan::new(64, 48, 32, 8).unwrap();
        assert_eq!(plan.len(), 6);
        assert!(!plan.is_empty());
        assert_eq!(plan.patch_size(), 32);
        assert_eq!(plan.width(), 64);
        assert_eq!(plan.height(), 48);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(PatchPosition::new(24, 16).to_string(), "(24, 16)");
    }
}

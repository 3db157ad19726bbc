//! Axis-aligned pixel regions and pixel windows.
//!
//! A [`Region`] is a half-open rectangle `[y0, y1) × [x0, x1)` on a 2D frame,
//! stored in `(rows, columns)` order so it indexes `ndarray` grids directly.
//! A [`PixelWindow`] is a half-open `(p0, p1)` offset measured from an anchor
//! edge (the front edge of a charge-injection region, or its trailing edge),
//! not an absolute coordinate.

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Ix2, SliceInfo, SliceInfoElem};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when building or applying regions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    /// Bounds with `y1 <= y0` or `x1 <= x0`.
    #[error("degenerate region ({y0}, {y1}, {x0}, {x1}): requires y0 < y1 and x0 < x1")]
    Degenerate {
        y0: usize,
        y1: usize,
        x0: usize,
        x1: usize,
    },

    /// Region does not fit inside the frame it is applied to.
    #[error("region {region} exceeds frame of shape {rows}x{columns}")]
    OutsideFrame {
        region: Region,
        rows: usize,
        columns: usize,
    },

    /// A transform would place a bound below zero.
    #[error("offset of {offset} pixels from {edge} at {anchor} falls below zero")]
    NegativeBound {
        edge: &'static str,
        anchor: usize,
        offset: usize,
    },

    /// Pixel window with `p1 <= p0`.
    #[error("degenerate pixel window ({p0}, {p1}): requires p0 < p1")]
    DegenerateWindow { p0: usize, p1: usize },
}

/// Immutable half-open rectangle `[y0, y1) × [x0, x1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "(usize, usize, usize, usize)",
    into = "(usize, usize, usize, usize)"
)]
pub struct Region {
    y0: usize,
    y1: usize,
    x0: usize,
    x1: usize,
}

impl Region {
    /// Create a region from `(y0, y1, x0, x1)` bounds.
    pub fn new(y0: usize, y1: usize, x0: usize, x1: usize) -> Result<Self, RegionError> {
        if y1 <= y0 || x1 <= x0 {
            return Err(RegionError::Degenerate { y0, y1, x0, x1 });
        }
        Ok(Self { y0, y1, x0, x1 })
    }

    pub fn y0(&self) -> usize {
        self.y0
    }

    pub fn y1(&self) -> usize {
        self.y1
    }

    pub fn x0(&self) -> usize {
        self.x0
    }

    pub fn x1(&self) -> usize {
        self.x1
    }

    /// Number of rows spanned (`y1 - y0`).
    pub fn total_rows(&self) -> usize {
        self.y1 - self.y0
    }

    /// Number of columns spanned (`x1 - x0`).
    pub fn total_columns(&self) -> usize {
        self.x1 - self.x0
    }

    /// Shape of the region as `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.total_rows(), self.total_columns())
    }

    /// Bounds as a `(y0, y1, x0, x1)` tuple.
    pub fn to_tuple(&self) -> (usize, usize, usize, usize) {
        (self.y0, self.y1, self.x0, self.x1)
    }

    /// Slice descriptor usable with `ArrayBase::slice`.
    pub fn slice(&self) -> SliceInfo<[SliceInfoElem; 2], Ix2, Ix2> {
        s![self.y0..self.y1, self.x0..self.x1]
    }

    /// True when the region lies entirely within a frame of `shape`.
    pub fn fits_within(&self, shape: (usize, usize)) -> bool {
        self.y1 <= shape.0 && self.x1 <= shape.1
    }

    /// Fail with [`RegionError::OutsideFrame`] unless the region fits `shape`.
    pub fn check_within(&self, shape: (usize, usize)) -> Result<(), RegionError> {
        if self.fits_within(shape) {
            Ok(())
        } else {
            Err(RegionError::OutsideFrame {
                region: *self,
                rows: shape.0,
                columns: shape.1,
            })
        }
    }

    /// Borrow the part of `array` covered by this region.
    pub fn view<'a, A>(&self, array: &'a Array2<A>) -> Result<ArrayView2<'a, A>, RegionError> {
        self.check_within(array.dim())?;
        Ok(array.slice(self.slice()))
    }

    /// Mutably borrow the part of `array` covered by this region.
    pub fn view_mut<'a, A>(
        &self,
        array: &'a mut Array2<A>,
    ) -> Result<ArrayViewMut2<'a, A>, RegionError> {
        self.check_within(array.dim())?;
        Ok(array.slice_mut(self.slice()))
    }

    /// Overlap of two regions, if any.
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let y0 = self.y0.max(other.y0);
        let y1 = self.y1.min(other.y1);
        let x0 = self.x0.max(other.x0);
        let x1 = self.x1.min(other.x1);
        Region::new(y0, y1, x0, x1).ok()
    }

    /// The part of this region inside `frame`, in `frame`'s own coordinates.
    pub fn relative_to(&self, frame: &Region) -> Option<Region> {
        let overlap = self.intersection(frame)?;
        Some(Region {
            y0: overlap.y0 - frame.y0,
            y1: overlap.y1 - frame.y0,
            x0: overlap.x0 - frame.x0,
            x1: overlap.x1 - frame.x0,
        })
    }

    /// Same region moved down by `rows`.
    pub fn shifted_rows(&self, rows: usize) -> Region {
        Region {
            y0: self.y0 + rows,
            y1: self.y1 + rows,
            ..*self
        }
    }
}

impl TryFrom<(usize, usize, usize, usize)> for Region {
    type Error = RegionError;

    fn try_from(bounds: (usize, usize, usize, usize)) -> Result<Self, Self::Error> {
        Region::new(bounds.0, bounds.1, bounds.2, bounds.3)
    }
}

impl From<Region> for (usize, usize, usize, usize) {
    fn from(region: Region) -> Self {
        region.to_tuple()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.y0, self.y1, self.x0, self.x1)
    }
}

/// Half-open `(p0, p1)` pixel offsets measured from an anchor edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct PixelWindow {
    start: usize,
    end: usize,
}

impl PixelWindow {
    pub fn new(start: usize, end: usize) -> Result<Self, RegionError> {
        if end <= start {
            return Err(RegionError::DegenerateWindow { p0: start, p1: end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of pixels covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Windows are never empty; provided for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<(usize, usize)> for PixelWindow {
    type Error = RegionError;

    fn try_from(window: (usize, usize)) -> Result<Self, Self::Error> {
        PixelWindow::new(window.0, window.1)
    }
}

impl From<PixelWindow> for (usize, usize) {
    fn from(window: PixelWindow) -> Self {
        (window.start, window.end)
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_rows_and_columns() {
        let region = Region::new(2, 7, 1, 4).unwrap();
        assert_eq!(region.total_rows(), 5);
        assert_eq!(region.total_columns(), 3);
        assert_eq!(region.shape(), (5, 3));
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        assert_eq!(
            Region::new(3, 3, 0, 1),
            Err(RegionError::Degenerate {
                y0: 3,
                y1: 3,
                x0: 0,
                x1: 1
            })
        );
        assert!(Region::new(0, 1, 4, 2).is_err());
    }

    #[test]
    fn test_slice_extracts_expected_block() {
        let array = Array2::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as f64);
        let region = Region::new(1, 3, 2, 4).unwrap();
        let block = array.slice(region.slice());
        assert_eq!(block.dim(), (2, 2));
        assert_eq!(block[[0, 0]], 6.0);
        assert_eq!(block[[1, 1]], 11.0);
    }

    #[test]
    fn test_view_outside_frame_fails() {
        let array = Array2::<f64>::zeros((3, 3));
        let region = Region::new(0, 4, 0, 3).unwrap();
        assert!(matches!(
            region.view(&array),
            Err(RegionError::OutsideFrame { rows: 3, .. })
        ));
    }

    #[test]
    fn test_view_mut_writes_into_array() {
        let mut array = Array2::<f64>::zeros((3, 3));
        let region = Region::new(0, 2, 1, 3).unwrap();
        region.view_mut(&mut array).unwrap().fill(1.0);
        assert_eq!(array.sum(), 4.0);
        assert_eq!(array[[0, 0]], 0.0);
    }

    #[test]
    fn test_relative_to_clips_and_rebases() {
        let region = Region::new(2, 6, 1, 5).unwrap();
        let frame = Region::new(4, 10, 0, 3).unwrap();
        assert_eq!(
            region.relative_to(&frame),
            Some(Region::new(0, 2, 1, 3).unwrap())
        );

        let disjoint = Region::new(0, 2, 0, 2).unwrap();
        assert_eq!(disjoint.relative_to(&frame), None);
    }

    #[test]
    fn test_deserialize_validates_bounds() {
        let region: Region = serde_json::from_str("[0, 2, 1, 3]").unwrap();
        assert_eq!(region.to_tuple(), (0, 2, 1, 3));
        assert!(serde_json::from_str::<Region>("[2, 2, 1, 3]").is_err());
    }

    #[test]
    fn test_pixel_window() {
        let window = PixelWindow::new(1, 4).unwrap();
        assert_eq!(window.len(), 3);
        assert!(PixelWindow::new(2, 2).is_err());
        assert!(PixelWindow::try_from((5, 1)).is_err());
        assert_eq!(format!("{}", window), "(1, 4)");
    }
}

//! Parallel-direction extractors: front edges, trails and calibration slabs
//! measured along rows.

use log::warn;
use ndarray::{Array2, Axis};

use super::{ExtractError, Extractor2D};
use crate::geometry::FrameGeometry;
use crate::layout::Layout2DCI;
use crate::region::{PixelWindow, Region};

/// Leading rows of every charge-injection region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractParallelFpr {
    layout: Layout2DCI,
}

impl ExtractParallelFpr {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }
}

impl Extractor2D for ExtractParallelFpr {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(1)
    }

    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(0, self.layout.total_rows_min())?)
    }

    fn region_list_from_window(&self, rows: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        let geometry = self.layout.geometry();
        self.layout
            .region_list()
            .iter()
            .map(|region| -> Result<Region, ExtractError> {
                if rows.end() > region.total_rows() {
                    warn!(
                        "FPR window {rows} runs past the {} rows of region {region}",
                        region.total_rows()
                    );
                }
                Ok(geometry.parallel_front_edge_region(region, rows)?)
            })
            .collect()
    }
}

/// Rows of parallel trail behind every charge-injection region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractParallelEper {
    layout: Layout2DCI,
}

impl ExtractParallelEper {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }
}

impl Extractor2D for ExtractParallelEper {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(1)
    }

    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(
            0,
            self.layout.smallest_parallel_trails_rows_from_shape(),
        )?)
    }

    fn region_list_from_window(&self, rows: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        let geometry = self.layout.geometry();
        self.layout
            .region_list()
            .iter()
            .map(|region| -> Result<Region, ExtractError> {
                Ok(geometry.parallel_trails_region(region, rows)?)
            })
            .collect()
    }
}

/// A single full-height slab of columns on the serial read-out side, used to
/// calibrate parallel CTI away from serial trails.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractParallelCalibration {
    layout: Layout2DCI,
}

impl ExtractParallelCalibration {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }

    fn slab_from(&self, columns: Option<PixelWindow>) -> Result<Region, ExtractError> {
        let columns = match columns {
            Some(columns) => columns,
            None => self.default_pixels()?,
        };
        Ok(self
            .layout
            .geometry()
            .parallel_side_nearest_read_out_region(self.layout.shape_2d(), columns)?)
    }

    /// Pixels of the calibration slab.
    pub fn array_2d_from<A: Clone>(
        &self,
        array: &Array2<A>,
        columns: Option<PixelWindow>,
    ) -> Result<Array2<A>, ExtractError> {
        let slab = self.slab_from(columns)?;
        Ok(slab.view(array)?.to_owned())
    }

    /// Layout of the extracted slab, with regions and bands clipped to it and
    /// expressed in its coordinates.
    pub fn layout_from(&self, columns: Option<PixelWindow>) -> Result<Layout2DCI, ExtractError> {
        let slab = self.slab_from(columns)?;
        let region_list = self
            .layout
            .region_list()
            .iter()
            .filter_map(|region| region.relative_to(&slab))
            .collect();

        let geometry = self.layout.geometry();
        let clip = |band: Option<Region>| band.and_then(|band| band.relative_to(&slab));
        let geometry = FrameGeometry::new(
            geometry.orientation,
            clip(geometry.parallel_overscan),
            clip(geometry.serial_prescan),
            clip(geometry.serial_overscan),
        );

        Ok(Layout2DCI::from_parts(slab.shape(), region_list, geometry))
    }
}

impl Extractor2D for ExtractParallelCalibration {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(1)
    }

    /// Every column of the frame.
    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(0, self.layout.shape_2d().1)?)
    }

    fn region_list_from_window(&self, columns: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        Ok(vec![self.slab_from(Some(columns))?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Orientation;
    use crate::mask::Mask2D;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn region(y0: usize, y1: usize, x0: usize, x1: usize) -> Region {
        Region::new(y0, y1, x0, x1).unwrap()
    }

    fn window(p0: usize, p1: usize) -> Option<PixelWindow> {
        PixelWindow::new(p0, p1).ok()
    }

    fn layout(shape: (usize, usize), regions: Vec<Region>, orientation: Orientation) -> Layout2DCI {
        Layout2DCI::new(shape, regions, FrameGeometry::bare(orientation)).unwrap()
    }

    #[test]
    fn test_fpr_region_list_bottom_and_top() {
        let regions = vec![region(1, 4, 0, 3), region(6, 9, 0, 3)];

        let bottom = ExtractParallelFpr::new(layout((10, 3), regions.clone(), Orientation::BottomLeft));
        assert_eq!(
            bottom.region_list_from(window(0, 2)).unwrap(),
            vec![region(1, 3, 0, 3), region(6, 8, 0, 3)]
        );

        let top = ExtractParallelFpr::new(layout((10, 3), regions, Orientation::TopRight));
        assert_eq!(
            top.region_list_from(window(0, 2)).unwrap(),
            vec![region(2, 4, 0, 3), region(7, 9, 0, 3)]
        );
    }

    #[test]
    fn test_fpr_default_window_is_smallest_region() {
        let extractor = ExtractParallelFpr::new(layout(
            (12, 3),
            vec![region(0, 4, 0, 3), region(6, 8, 0, 3)],
            Orientation::BottomLeft,
        ));
        assert_eq!(extractor.default_pixels().unwrap(), PixelWindow::new(0, 2).unwrap());
        assert_eq!(
            extractor.region_list_from(None).unwrap(),
            vec![region(0, 2, 0, 3), region(6, 8, 0, 3)]
        );
    }

    #[test]
    fn test_eper_default_window_stops_at_next_region() {
        let extractor = ExtractParallelEper::new(layout(
            (12, 3),
            vec![region(0, 2, 0, 3), region(5, 7, 0, 3)],
            Orientation::BottomLeft,
        ));
        assert_eq!(
            extractor.region_list_from(None).unwrap(),
            vec![region(2, 5, 0, 3), region(7, 10, 0, 3)]
        );
    }

    #[test]
    fn test_eper_default_window_without_trail_fails() {
        let extractor = ExtractParallelEper::new(layout(
            (4, 3),
            vec![region(0, 4, 0, 3)],
            Orientation::BottomLeft,
        ));
        assert!(extractor.region_list_from(None).is_err());
    }

    #[test]
    fn test_fpr_stacked_and_binned() {
        let array = array![
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [2.0, 2.0, 2.0],
            [0.0, 0.0, 0.0],
            [3.0, 3.0, 3.0],
            [6.0, 6.0, 6.0],
        ];
        let extractor = ExtractParallelFpr::new(layout(
            (6, 3),
            vec![region(1, 3, 0, 3), region(4, 6, 0, 3)],
            Orientation::BottomLeft,
        ));

        let stacked = extractor
            .stacked_array_2d_from(&array, None, window(0, 2))
            .unwrap();
        assert_eq!(stacked.data(), &array![[2.0, 2.0, 2.0], [4.0, 4.0, 4.0]]);

        let binned = extractor
            .binned_array_1d_from(&array, None, window(0, 2))
            .unwrap();
        assert_eq!(binned, array![2.0, 4.0]);
    }

    #[test]
    fn test_binned_with_mask() {
        let array = array![[1.0, 3.0], [10.0, 20.0], [0.0, 0.0]];
        let mut mask = Mask2D::unmasked((3, 2));
        mask.mask_pixel(0, 1);
        mask.mask_pixel(1, 0);
        mask.mask_pixel(1, 1);

        let extractor = ExtractParallelFpr::new(layout(
            (3, 2),
            vec![region(0, 2, 0, 2)],
            Orientation::BottomLeft,
        ));
        let binned = extractor
            .binned_array_1d_from(&array, Some(&mask), window(0, 2))
            .unwrap();
        assert_relative_eq!(binned[0], 1.0);
        assert_eq!(binned[1], f64::INFINITY);
    }

    #[test]
    fn test_stacking_regions_of_different_widths_fails() {
        let extractor = ExtractParallelFpr::new(layout(
            (6, 4),
            vec![region(0, 2, 0, 4), region(3, 5, 0, 3)],
            Orientation::BottomLeft,
        ));
        let array = Array2::<f64>::zeros((6, 4));
        assert!(matches!(
            extractor.binned_array_1d_from(&array, None, window(0, 1)),
            Err(ExtractError::InconsistentShapes { .. })
        ));
    }

    #[test]
    fn test_parallel_calibration_slab_and_layout() {
        let layout = Layout2DCI::new(
            (6, 8),
            vec![region(1, 3, 2, 8), region(4, 6, 2, 8)],
            FrameGeometry::new(
                Orientation::BottomLeft,
                None,
                Some(region(0, 6, 0, 2)),
                Some(region(0, 6, 7, 8)),
            ),
        )
        .unwrap();
        let extractor = ExtractParallelCalibration::new(layout);

        let array = Array2::from_shape_fn((6, 8), |(y, x)| (y * 8 + x) as f64);
        let slab = extractor.array_2d_from(&array, window(1, 4)).unwrap();
        assert_eq!(slab.dim(), (6, 3));
        assert_eq!(slab[[0, 0]], 1.0);

        let calibration = extractor.layout_from(window(1, 4)).unwrap();
        assert_eq!(calibration.shape_2d(), (6, 3));
        assert_eq!(
            calibration.region_list(),
            &[region(1, 3, 1, 3), region(4, 6, 1, 3)]
        );
        assert_eq!(calibration.geometry().serial_prescan, Some(region(0, 6, 0, 1)));
        assert_eq!(calibration.geometry().serial_overscan, None);
    }

    #[test]
    fn test_parallel_calibration_right_orientation() {
        let extractor = ExtractParallelCalibration::new(layout(
            (4, 10),
            vec![region(0, 2, 0, 10)],
            Orientation::TopRight,
        ));
        assert_eq!(
            extractor.region_list_from(window(0, 3)).unwrap(),
            vec![region(0, 4, 7, 10)]
        );
    }
}

//! Serial-direction extractors: front edges, trails and calibration slabs
//! measured along columns.

use log::warn;
use ndarray::{s, Array2, Axis};

use super::{ExtractError, Extractor2D};
use crate::geometry::FrameGeometry;
use crate::layout::Layout2DCI;
use crate::region::{PixelWindow, Region};

/// Leading columns of every charge-injection region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSerialFpr {
    layout: Layout2DCI,
}

impl ExtractSerialFpr {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }
}

impl Extractor2D for ExtractSerialFpr {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(0)
    }

    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(0, self.layout.total_columns_min())?)
    }

    fn region_list_from_window(&self, columns: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        let geometry = self.layout.geometry();
        self.layout
            .region_list()
            .iter()
            .map(|region| -> Result<Region, ExtractError> {
                if columns.end() > region.total_columns() {
                    warn!(
                        "FPR window {columns} runs past the {} columns of region {region}",
                        region.total_columns()
                    );
                }
                Ok(geometry.serial_front_edge_region(region, columns)?)
            })
            .collect()
    }
}

/// Columns of serial trail behind every charge-injection region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSerialEper {
    layout: Layout2DCI,
}

impl ExtractSerialEper {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }
}

impl Extractor2D for ExtractSerialEper {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(0)
    }

    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(
            0,
            self.layout.serial_trail_size_to_image_edge(),
        )?)
    }

    fn region_list_from_window(&self, columns: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        let geometry = self.layout.geometry();
        self.layout
            .region_list()
            .iter()
            .map(|region| -> Result<Region, ExtractError> {
                Ok(geometry.serial_trails_region(region, columns)?)
            })
            .collect()
    }
}

/// Full-width slabs of rows through every charge-injection region (prescan,
/// region and serial trail), stacked vertically into one calibration frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSerialCalibration {
    layout: Layout2DCI,
}

impl ExtractSerialCalibration {
    pub fn new(layout: Layout2DCI) -> Self {
        Self { layout }
    }

    /// Slabs paired with the region each was cut through.
    fn slabs_from(
        &self,
        rows: Option<PixelWindow>,
    ) -> Result<Vec<(Region, Region)>, ExtractError> {
        let rows = match rows {
            Some(rows) => rows,
            None => self.default_pixels()?,
        };
        let geometry = self.layout.geometry();
        let shape = self.layout.shape_2d();

        self.layout
            .region_list()
            .iter()
            .map(|region| -> Result<(Region, Region), ExtractError> {
                let full_width = geometry.serial_prescan_ci_region_and_trails(region, shape)?;
                let slab = geometry.parallel_front_edge_region(&full_width, rows)?;
                Ok((*region, slab))
            })
            .collect()
    }

    /// All slabs concatenated top to bottom, in region order.
    pub fn array_2d_from<A: Clone + Default>(
        &self,
        array: &Array2<A>,
        rows: Option<PixelWindow>,
    ) -> Result<Array2<A>, ExtractError> {
        let slabs = self.slabs_from(rows)?;
        let (_, first) = slabs.first().ok_or(ExtractError::NoRegions)?;
        let slab_shape = first.shape();

        let mut calibration =
            Array2::from_elem((slab_shape.0 * slabs.len(), slab_shape.1), A::default());
        for (index, (_, slab)) in slabs.iter().enumerate() {
            if slab.shape() != slab_shape {
                return Err(ExtractError::InconsistentShapes {
                    expected: slab_shape,
                    found: slab.shape(),
                });
            }
            let offset = index * slab_shape.0;
            calibration
                .slice_mut(s![offset..offset + slab_shape.0, ..])
                .assign(&slab.view(array)?);
        }
        Ok(calibration)
    }

    /// Layout of the concatenated frame: each region clipped to its slab and
    /// moved to the slab's new row offset; prescan and overscan keep their
    /// columns and span the new height. The parallel overscan is not carried.
    pub fn layout_from(&self, rows: Option<PixelWindow>) -> Result<Layout2DCI, ExtractError> {
        let slabs = self.slabs_from(rows)?;
        let (_, first) = slabs.first().ok_or(ExtractError::NoRegions)?;
        let slab_rows = first.total_rows();
        let total_rows = slab_rows * slabs.len();

        let region_list = slabs
            .iter()
            .enumerate()
            .filter_map(|(index, (region, slab))| {
                region
                    .relative_to(slab)
                    .map(|local| local.shifted_rows(index * slab_rows))
            })
            .collect();

        let geometry = self.layout.geometry();
        let full_height = |band: Option<Region>| {
            band.and_then(|band| Region::new(0, total_rows, band.x0(), band.x1()).ok())
        };
        let geometry = FrameGeometry::new(
            geometry.orientation,
            None,
            full_height(geometry.serial_prescan),
            full_height(geometry.serial_overscan),
        );

        Ok(Layout2DCI::from_parts(
            (total_rows, self.layout.shape_2d().1),
            region_list,
            geometry,
        ))
    }
}

impl Extractor2D for ExtractSerialCalibration {
    fn layout(&self) -> &Layout2DCI {
        &self.layout
    }

    fn binning_axis(&self) -> Axis {
        Axis(0)
    }

    /// Rows of the shortest region.
    fn default_pixels(&self) -> Result<PixelWindow, ExtractError> {
        Ok(PixelWindow::new(0, self.layout.total_rows_min())?)
    }

    fn region_list_from_window(&self, rows: PixelWindow) -> Result<Vec<Region>, ExtractError> {
        Ok(self
            .slabs_from(Some(rows))?
            .into_iter()
            .map(|(_, slab)| slab)
            .collect())
    }
}
